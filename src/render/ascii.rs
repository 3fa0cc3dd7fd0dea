use crate::render::{Frame, Renderer, luma_u8, text_frame_begin, text_frame_end, write_fg_rgb};
use std::io::Write;

/// Dark to bright.
const RAMP: &[u8] = b" .:-=+*#%@";

pub struct AsciiRenderer {
    last_fg: Option<(u8, u8, u8)>,
}

impl AsciiRenderer {
    pub fn new() -> Self {
        Self { last_fg: None }
    }
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn ramp_char(r: u8, g: u8, b: u8) -> u8 {
    let l = luma_u8(r, g, b) as usize;
    RAMP[l * (RAMP.len() - 1) / 255]
}

impl Renderer for AsciiRenderer {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 1, out)? else {
            return Ok(());
        };
        self.last_fg = None;

        for y in 0..visual_rows {
            for x in 0..cols {
                let idx = (y * w + x) * 4;
                let fg = (
                    frame.pixels_rgba[idx],
                    frame.pixels_rgba[idx + 1],
                    frame.pixels_rgba[idx + 2],
                );
                if self.last_fg != Some(fg) {
                    write_fg_rgb(out, fg.0, fg.1, fg.2)?;
                    self.last_fg = Some(fg);
                }
                out.write_all(&[ramp_char(fg.0, fg.1, fg.2)])?;
            }
            out.write_all(b"\r\n")?;
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
