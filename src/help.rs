use crate::terminal::{Canvas, Style};
use crossterm::style::Color;

pub const KEYS: &str = "\
barscope
←/→      bar width
↑/↓      space width
+/-      base line size
space    next draw mode
i        invert drawing
!..)     color scheme
?        close help
q/Esc    quit";

/// Draw a centered boxed overlay with `text` onto the canvas.
pub fn render_help_overlay(canvas: &mut Canvas, text: &str) {
    if text.is_empty() {
        return;
    }
    let (width, height) = canvas.size();

    let lines: Vec<&str> = text.lines().collect();
    let max_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let box_width = max_width + 4;
    let box_height = lines.len() + 2;

    let x0 = (width as usize).saturating_sub(box_width) / 2;
    let y0 = (height as usize).saturating_sub(box_height) / 2;
    let x1 = x0 + box_width - 1;
    let y1 = y0 + box_height - 1;

    let border = Style {
        fg: Some(Color::White),
        ..Style::default()
    };
    let body = Style {
        fg: Some(Color::Grey),
        ..Style::default()
    };

    for x in x0 + 1..x1 {
        canvas.set(x as i32, y0 as i32, '─', border);
        canvas.set(x as i32, y1 as i32, '─', border);
    }
    canvas.set(x0 as i32, y0 as i32, '┌', border);
    canvas.set(x1 as i32, y0 as i32, '┐', border);
    canvas.set(x0 as i32, y1 as i32, '└', border);
    canvas.set(x1 as i32, y1 as i32, '┘', border);

    for (i, line) in lines.iter().enumerate() {
        let y = (y0 + 1 + i) as i32;
        canvas.set(x0 as i32, y, '│', border);
        let padding = max_width.saturating_sub(line.chars().count());
        let padded = format!(" {line}{} ", " ".repeat(padding));
        canvas.set_str(x0 as i32 + 1, y, &padded, body);
        canvas.set(x1 as i32, y, '│', border);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_is_centered_and_boxed() {
        let mut c = Canvas::new(20, 7);
        render_help_overlay(&mut c, "ab\ncdef");
        // 8 wide, 4 high box centered in 20x7
        assert_eq!(c.get(6, 1).map(|x| x.ch), Some('┌'));
        assert_eq!(c.get(13, 1).map(|x| x.ch), Some('┐'));
        assert_eq!(c.get(6, 4).map(|x| x.ch), Some('└'));
        assert_eq!(c.get(8, 2).map(|x| x.ch), Some('a'));
        assert_eq!(c.get(8, 3).map(|x| x.ch), Some('c'));
    }

    #[test]
    fn oversized_overlay_is_clipped() {
        let mut c = Canvas::new(4, 2);
        render_help_overlay(&mut c, KEYS);
        assert_eq!(c.size(), (4, 2));
    }
}
