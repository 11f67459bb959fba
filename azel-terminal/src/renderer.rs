/// Truecolor half-block presenter for terminal output
use azel_core::{FrameBuffer, Rgb};
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;

/// Upper half block: foreground paints the top pixel, background the bottom
const HALF_BLOCK: char = '\u{2580}';

/// Writes a framebuffer to the terminal, two pixel rows per character row
pub struct TerminalPresenter {
    columns: u16,
    rows: u16,
}

impl TerminalPresenter {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.columns = columns;
        self.rows = rows;
    }

    /// Framebuffer dimensions that fill the terminal
    pub fn framebuffer_size(&self) -> (usize, usize) {
        (self.columns as usize, self.rows as usize * 2)
    }

    pub fn draw<W: Write>(&self, framebuffer: &FrameBuffer, writer: &mut W) -> std::io::Result<()> {
        let mut last: Option<(Rgb, Rgb)> = None;
        let pixel_rows = framebuffer.height().div_ceil(2) as u16;

        for row in 0..self.rows.min(pixel_rows) {
            writer.queue(cursor::MoveTo(0, row))?;
            let top_y = row as i32 * 2;
            for x in 0..self.columns.min(framebuffer.width() as u16) {
                let top = framebuffer.pixel(x as i32, top_y).unwrap_or(Rgb::BLACK);
                let bottom = framebuffer.pixel(x as i32, top_y + 1).unwrap_or(Rgb::BLACK);

                // Only emit color changes
                if last != Some((top, bottom)) {
                    writer.queue(SetForegroundColor(to_color(top)))?;
                    writer.queue(SetBackgroundColor(to_color(bottom)))?;
                    last = Some((top, bottom));
                }
                writer.queue(Print(HALF_BLOCK))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

fn to_color(c: Rgb) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}
