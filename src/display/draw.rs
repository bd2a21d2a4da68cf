//! Bar layout and glyph painting.
//!
//! Every direction has eight sub-cell steps. Upward and rightward caps use
//! the lower and left eighth blocks directly; downward and leftward caps use
//! the complementary glyph with reversed colors.

use super::{DisplayConfig, DrawType};
use crate::processor::Frame;
use crate::terminal::{Canvas, Style};

pub const FULL: char = '█';
/// `LOWER[k]` fills the bottom `k/8` of a cell.
pub const LOWER: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
/// `LEFT[k]` fills the left `k/8` of a cell.
pub const LEFT: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Height of `value` in eighths of a cell, for a bar that may span `span`
/// cells when `value == scale`.
pub fn steps(value: f64, span: usize, scale: f64) -> usize {
    if span == 0 || value.is_nan() || value <= 0.0 {
        return 0;
    }
    let max = (span * 8) as f64;
    let s = (value * span as f64 / scale.max(f64::MIN_POSITIVE) * 8.0).floor();
    s.min(max) as usize
}

fn style_at(styles: &[Style], distance: usize) -> Style {
    styles
        .get(distance)
        .or_else(|| styles.last())
        .copied()
        .unwrap_or_default()
}

/// Bar `[x, x + width)` growing up from the row above `base`.
pub fn paint_up(canvas: &mut Canvas, x: i32, width: i32, base: i32, steps: usize, styles: &[Style]) {
    let (full, rem) = (steps / 8, steps % 8);
    for k in 0..full {
        let y = base - 1 - k as i32;
        for dx in 0..width {
            canvas.set(x + dx, y, FULL, style_at(styles, k));
        }
    }
    if rem > 0 {
        let y = base - 1 - full as i32;
        for dx in 0..width {
            canvas.set(x + dx, y, LOWER[rem], style_at(styles, full));
        }
    }
}

/// Bar `[x, x + width)` growing down from row `top`.
pub fn paint_down(canvas: &mut Canvas, x: i32, width: i32, top: i32, steps: usize, styles: &[Style]) {
    let (full, rem) = (steps / 8, steps % 8);
    for k in 0..full {
        for dx in 0..width {
            canvas.set(x + dx, top + k as i32, FULL, style_at(styles, k));
        }
    }
    if rem > 0 {
        let style = style_at(styles, full).reversed();
        for dx in 0..width {
            canvas.set(x + dx, top + full as i32, LOWER[8 - rem], style);
        }
    }
}

/// Bar `[y, y + height)` growing right from column `left`.
pub fn paint_right(canvas: &mut Canvas, y: i32, height: i32, left: i32, steps: usize, styles: &[Style]) {
    let (full, rem) = (steps / 8, steps % 8);
    for k in 0..full {
        for dy in 0..height {
            canvas.set(left + k as i32, y + dy, FULL, style_at(styles, k));
        }
    }
    if rem > 0 {
        for dy in 0..height {
            canvas.set(left + full as i32, y + dy, LEFT[rem], style_at(styles, full));
        }
    }
}

/// Bar `[y, y + height)` growing left from the column before `right`.
pub fn paint_left(canvas: &mut Canvas, y: i32, height: i32, right: i32, steps: usize, styles: &[Style]) {
    let (full, rem) = (steps / 8, steps % 8);
    for k in 0..full {
        for dy in 0..height {
            canvas.set(right - 1 - k as i32, y + dy, FULL, style_at(styles, k));
        }
    }
    if rem > 0 {
        let style = style_at(styles, full).reversed();
        for dy in 0..height {
            canvas.set(right - 1 - full as i32, y + dy, LEFT[8 - rem], style);
        }
    }
}

fn fill(canvas: &mut Canvas, x: i32, y: i32, w: i32, h: i32, style: Style) {
    for yy in y..y + h {
        for xx in x..x + w {
            canvas.set(xx, yy, FULL, style);
        }
    }
}

fn stride(cfg: &DisplayConfig) -> usize {
    (cfg.bar_width.max(1) + cfg.space_width.max(0)) as usize
}

/// Bars per channel that fit on a `width` x `height` screen.
pub fn bins(cfg: &DisplayConfig, width: u16, height: u16, channels: usize) -> usize {
    let sw = cfg.space_width.max(0) as usize;
    let stride = stride(cfg);
    let n = match cfg.draw_type {
        DrawType::Up | DrawType::Down if channels >= 2 => (width as usize + sw) / (2 * stride),
        DrawType::Up | DrawType::Down | DrawType::UpDown => (width as usize + sw) / stride,
        DrawType::LeftRight => (height as usize + sw) / stride,
    };
    n.max(1)
}

/// Longest bar, in cells, for the current mode.
pub fn max_span(cfg: &DisplayConfig, width: u16, height: u16) -> usize {
    let base = cfg.base_size.max(0) as usize;
    match cfg.draw_type {
        DrawType::Up | DrawType::Down => (height as usize).saturating_sub(base),
        DrawType::UpDown => ((height as usize).saturating_sub(base) + 1) / 2,
        DrawType::LeftRight => ((width as usize).saturating_sub(base) + 1) / 2,
    }
}

fn bin_for(bar: usize, count: usize, reversed: bool) -> usize {
    if reversed {
        count - 1 - bar
    } else {
        bar
    }
}

/// Paint one frame. The canvas is expected to be cleared.
pub fn draw(canvas: &mut Canvas, cfg: &DisplayConfig, frame: &Frame<'_>, styles: &[Style], center: Style) {
    let (width, height) = canvas.size();
    let (w, h) = (width as i32, height as i32);
    let base = cfg.base_size.max(0);
    let bw = cfg.bar_width.max(1);
    let sw = cfg.space_width.max(0);
    let stride = bw + sw;
    let count = frame.bar_count;
    let stereo = frame.channels >= 2;
    let value = |ch: usize, bin: usize| -> f64 {
        let ch = if ch < frame.channels { ch } else { 0 };
        frame.channel(ch).get(bin).copied().unwrap_or(0.0)
    };

    match cfg.draw_type {
        DrawType::Up | DrawType::Down => {
            let up = cfg.draw_type == DrawType::Up;
            let span = (h - base).max(0);
            let base_y = if up { h - base } else { 0 };
            fill(canvas, 0, base_y, w, base.min(h), center);
            if count == 0 || span == 0 {
                return;
            }

            let block = count as i32 * stride - sw;
            let blocks = if stereo { 2 } else { 1 };
            let total = blocks * block + (blocks - 1) * sw;
            let x0 = (w - total).max(0) / 2;

            for ch in 0..blocks as usize {
                let left_block = ch == 0;
                let bx = x0 + ch as i32 * (block + sw);
                // Stereo puts the high end of both channels in the middle.
                let reversed = if stereo && !left_block { !cfg.invert } else { cfg.invert };
                for bar in 0..count {
                    let bin = bin_for(bar, count, reversed);
                    let s = steps(value(ch, bin), span as usize, frame.scale);
                    let x = bx + bar as i32 * stride;
                    if up {
                        paint_up(canvas, x, bw, h - base, s, styles);
                    } else {
                        paint_down(canvas, x, bw, base, s, styles);
                    }
                }
            }
        }
        DrawType::UpDown => {
            let avail = (h - base).max(0);
            let up_span = (avail + 1) / 2;
            let down_span = avail / 2;
            fill(canvas, 0, up_span, w, base.min(h), center);
            if count == 0 {
                return;
            }

            let total = count as i32 * stride - sw;
            let x0 = (w - total).max(0) / 2;
            let lower_ch = if stereo { 1 } else { 0 };
            for bar in 0..count {
                let bin = bin_for(bar, count, cfg.invert);
                let x = x0 + bar as i32 * stride;
                let su = steps(value(0, bin), up_span as usize, frame.scale);
                paint_up(canvas, x, bw, up_span, su, styles);
                let sd = steps(value(lower_ch, bin), down_span as usize, frame.scale);
                paint_down(canvas, x, bw, up_span + base, sd, styles);
            }
        }
        DrawType::LeftRight => {
            let avail = (w - base).max(0);
            let left_span = (avail + 1) / 2;
            let right_span = avail / 2;
            fill(canvas, left_span, 0, base.min(w), h, center);
            if count == 0 {
                return;
            }

            let total = count as i32 * stride - sw;
            let y0 = (h - total).max(0) / 2;
            let right_ch = if stereo { 1 } else { 0 };
            for bar in 0..count {
                let bin = bin_for(bar, count, cfg.invert);
                let y = y0 + bar as i32 * stride;
                let sl = steps(value(0, bin), left_span as usize, frame.scale);
                paint_left(canvas, y, bw, left_span, sl, styles);
                let sr = steps(value(right_ch, bin), right_span as usize, frame.scale);
                paint_right(canvas, y, bw, left_span + base, sr, styles);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Filled fraction of a cell, reading reversed caps as their complement.
    fn ink(canvas: &Canvas) -> f64 {
        canvas
            .rows()
            .iter()
            .flatten()
            .map(|cell| {
                let k = LOWER
                    .iter()
                    .position(|&c| c == cell.ch)
                    .or_else(|| LEFT.iter().position(|&c| c == cell.ch))
                    .unwrap_or(0) as f64;
                if cell.style.reverse {
                    (8.0 - k) / 8.0
                } else {
                    k / 8.0
                }
            })
            .sum()
    }

    fn cfg(draw_type: DrawType) -> DisplayConfig {
        DisplayConfig {
            draw_type,
            ..DisplayConfig::default()
        }
    }

    #[test]
    fn step_count_is_clamped() {
        assert_eq!(steps(0.0, 10, 1.0), 0);
        assert_eq!(steps(-3.0, 10, 1.0), 0);
        assert_eq!(steps(f64::NAN, 10, 1.0), 0);
        assert_eq!(steps(0.5, 10, 1.0), 40);
        assert_eq!(steps(7.0, 10, 1.0), 80);
        assert_eq!(steps(1.0, 0, 1.0), 0);
    }

    #[test]
    fn ink_matches_height_in_every_direction() {
        let rows = 5usize;
        for k in 0..=8 * rows {
            type Painter = fn(&mut Canvas, i32, i32, i32, usize, &[Style]);
            let painters: [(Painter, i32); 4] = [
                (paint_up, rows as i32),
                (paint_down, 0),
                (paint_right, 0),
                (paint_left, rows as i32),
            ];
            for (paint, origin) in painters {
                let mut c = Canvas::new(rows as u16, rows as u16);
                paint(&mut c, 0, 1, origin, k, &[Style::default()]);
                assert!((ink(&c) - k as f64 / 8.0).abs() < 1e-12, "k={k}");
            }
        }
    }

    #[test]
    fn zero_height_draws_nothing_and_full_height_fills() {
        let mut c = Canvas::new(1, 4);
        paint_up(&mut c, 0, 1, 4, 0, &[]);
        assert!(c.rows().iter().flatten().all(|cell| cell.ch == ' '));

        paint_up(&mut c, 0, 1, 4, steps(100.0, 4, 1.0), &[]);
        assert!(c.rows().iter().flatten().all(|cell| cell.ch == FULL));
    }

    #[test]
    fn downward_cap_is_reversed_complement() {
        let mut c = Canvas::new(1, 3);
        paint_down(&mut c, 0, 1, 0, 11, &[Style::default()]);
        assert_eq!(c.get(0, 0).map(|x| x.ch), Some(FULL));
        let cap = c.get(0, 1).copied().unwrap();
        assert_eq!(cap.ch, LOWER[5]);
        assert!(cap.style.reverse);
    }

    #[test]
    fn bins_per_layout() {
        let mut c = cfg(DrawType::Up);
        c.bar_width = 2;
        c.space_width = 1;
        assert_eq!(bins(&c, 80, 24, 1), 27);
        assert_eq!(bins(&c, 80, 24, 2), 13);
        c.draw_type = DrawType::UpDown;
        assert_eq!(bins(&c, 80, 24, 2), 27);
        c.draw_type = DrawType::LeftRight;
        assert_eq!(bins(&c, 80, 24, 2), 8);
        c.bar_width = 500;
        assert_eq!(bins(&c, 80, 24, 1), 1);
    }

    #[test]
    fn spans_per_layout() {
        let mut c = cfg(DrawType::Up);
        c.base_size = 1;
        assert_eq!(max_span(&c, 80, 24), 23);
        c.draw_type = DrawType::UpDown;
        assert_eq!(max_span(&c, 80, 24), 12);
        c.draw_type = DrawType::LeftRight;
        assert_eq!(max_span(&c, 80, 24), 40);
        c.base_size = 100;
        assert_eq!(max_span(&c, 80, 24), 0);
    }

    fn frame_of<'a>(bars: &'a [Vec<f64>], count: usize) -> Frame<'a> {
        Frame {
            bars,
            channels: bars.len(),
            bar_count: count,
            peak: 1.0,
            scale: 1.0,
        }
    }

    #[test]
    fn stereo_up_puts_high_end_in_the_middle() {
        let mut c = cfg(DrawType::Up);
        c.bar_width = 1;
        c.space_width = 0;
        c.base_size = 0;
        let mut canvas = Canvas::new(8, 4);
        // Only the highest bar of each channel is loud.
        let bars = vec![vec![0.0, 0.0, 0.0, 1.0], vec![0.0, 0.0, 0.0, 1.0]];
        draw(&mut canvas, &c, &frame_of(&bars, 4), &[Style::default()], Style::default());
        let lit: Vec<usize> = (0..8)
            .filter(|&x| canvas.get(x as u16, 3).map(|cell| cell.ch) == Some(FULL))
            .collect();
        assert_eq!(lit, vec![3, 4]);

        c.invert = true;
        canvas.clear();
        draw(&mut canvas, &c, &frame_of(&bars, 4), &[Style::default()], Style::default());
        let lit: Vec<usize> = (0..8)
            .filter(|&x| canvas.get(x as u16, 3).map(|cell| cell.ch) == Some(FULL))
            .collect();
        assert_eq!(lit, vec![0, 7]);
    }

    #[test]
    fn updown_splits_channels_around_base() {
        let mut c = cfg(DrawType::UpDown);
        c.bar_width = 1;
        c.space_width = 0;
        c.base_size = 1;
        let mut canvas = Canvas::new(2, 5);
        let bars = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let center = Style {
            bold: true,
            ..Style::default()
        };
        draw(&mut canvas, &c, &frame_of(&bars, 2), &[Style::default()], center);
        // Row 2 is the base line.
        assert!(canvas.rows()[2].iter().all(|cell| cell.ch == FULL && cell.style == center));
        // Channel 0 bar 0 goes up, channel 1 bar 1 goes down.
        assert_eq!(canvas.get(0, 0).map(|x| x.ch), Some(FULL));
        assert_eq!(canvas.get(1, 0).map(|x| x.ch), Some(' '));
        assert_eq!(canvas.get(1, 4).map(|x| x.ch), Some(FULL));
        assert_eq!(canvas.get(0, 4).map(|x| x.ch), Some(' '));
    }

    #[test]
    fn left_right_grows_from_center_column() {
        let mut c = cfg(DrawType::LeftRight);
        c.bar_width = 1;
        c.space_width = 0;
        c.base_size = 0;
        let mut canvas = Canvas::new(6, 1);
        let bars = vec![vec![0.5], vec![1.0]];
        draw(&mut canvas, &c, &frame_of(&bars, 1), &[Style::default()], Style::default());
        let row: String = canvas.rows()[0].iter().map(|cell| cell.ch).collect();
        // Left: one full cell plus a reversed half cap. Right: three full cells.
        assert_eq!(row, " ▌████");
    }

    #[test]
    fn silence_leaves_only_base() {
        let c = cfg(DrawType::Up);
        let mut canvas = Canvas::new(20, 10);
        let bars = vec![vec![0.0; 5], vec![0.0; 5]];
        draw(&mut canvas, &c, &frame_of(&bars, 5), &[Style::default()], Style::default());
        let base = c.base_size as usize;
        for (y, row) in canvas.rows().iter().enumerate() {
            let expect = if y >= 10 - base { FULL } else { ' ' };
            assert!(row.iter().all(|cell| cell.ch == expect), "row {y}");
        }
    }
}
