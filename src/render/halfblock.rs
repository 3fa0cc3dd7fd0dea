use crate::render::{Frame, Renderer, text_frame_begin, text_frame_end, write_bg_rgb, write_fg_rgb};
use std::io::Write;

const HALF_BLOCK: &str = "\u{2580}";

/// Two vertically stacked pixels per cell: foreground paints the top half, background the bottom.
pub struct HalfBlockRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 2, out)? else {
            return Ok(());
        };
        self.last_fg = None;
        self.last_bg = None;

        let px = |x: usize, y: usize| {
            let i = (y * w + x) * 4;
            (
                frame.pixels_rgba[i],
                frame.pixels_rgba[i + 1],
                frame.pixels_rgba[i + 2],
            )
        };

        for row in 0..visual_rows {
            for x in 0..cols {
                let top = px(x, row * 2);
                let bottom = px(x, row * 2 + 1);
                if self.last_fg != Some(top) {
                    write_fg_rgb(out, top.0, top.1, top.2)?;
                    self.last_fg = Some(top);
                }
                if self.last_bg != Some(bottom) {
                    write_bg_rgb(out, bottom.0, bottom.1, bottom.2)?;
                    self.last_bg = Some(bottom);
                }
                out.write_all(HALF_BLOCK.as_bytes())?;
            }
            out.write_all(b"\r\n")?;
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
