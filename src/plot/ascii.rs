//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed samples: `o`
//! - initial-guess curve: `+`
//! - fitted curve: `-`

use crate::domain::{AuxParameters, Series, TunableParameters};
use crate::models::value_at;

/// Render observed data with the initial-guess and fitted curves.
///
/// Both curves are evaluated with `aux` (the final `dt` / `cvert`), over the
/// time range of `display`.
pub fn render_fit_plot(
    display: &Series,
    guess: &TunableParameters,
    fitted: &TunableParameters,
    aux: &AuxParameters,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (t_min, t_max) = match display.time_range() {
        Some((lo, hi)) if hi > lo => (lo, hi),
        _ => (aux.graph_left_cutoff, aux.graph_right_cutoff.max(aux.graph_left_cutoff + 1.0)),
    };

    let guess_curve = sample_curve(guess, aux, t_min, t_max, width);
    let fit_curve = sample_curve(fitted, aux, t_min, t_max, width);
    let points: Vec<(f64, f64)> = display.samples.iter().map(|s| (s.time, s.value)).collect();

    let (y_min, y_max) = y_range([points.as_slice(), &guess_curve, &fit_curve]).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let frame = Frame {
        t_min,
        t_max,
        y_min,
        y_max,
    };

    // Fitted curve first so it wins where the two curves overlap; points overlay both.
    draw_curve(&mut grid, &fit_curve, &frame, '-');
    draw_curve(&mut grid, &guess_curve, &frame, '+');
    for &(t, y) in &points {
        if !(t.is_finite() && y.is_finite()) {
            continue;
        }
        let (x, row) = frame.cell(t, y, width, height);
        grid[row][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: t=[{t_min:.3}, {t_max:.3}] | y=[{y_min:.4}, {y_max:.4}] | o data, + guess, - fit\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

struct Frame {
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn cell(&self, t: f64, y: f64, width: usize, height: usize) -> (usize, usize) {
        (
            map_x(t, self.t_min, self.t_max, width),
            map_y(y, self.y_min, self.y_max, height),
        )
    }
}

fn sample_curve(
    params: &TunableParameters,
    aux: &AuxParameters,
    t_min: f64,
    t_max: f64,
    n: usize,
) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let t = t_min + (t_max - t_min) * i as f64 / (n as f64 - 1.0);
            (t, value_at(t, params, aux))
        })
        .collect()
}

fn y_range(sets: [&[(f64, f64)]; 3]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in sets.iter().flat_map(|s| s.iter()) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], frame: &Frame, ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        // Break the line at non-finite values instead of clamping them to an edge.
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let (x, row) = frame.cell(t, y, width, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, row, ch),
            None if grid[row][x] == ' ' => grid[row][x] = ch,
            None => {}
        }
        prev = Some((x, row));
    }
}

/// Integer line drawing (Bresenham). Only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluate;

    fn aux() -> AuxParameters {
        AuxParameters {
            dt: 10.0,
            cvert: 0.0,
            c3: 1.0,
            r: 1.0,
            dt_min: 0.0,
            dt_max: 100.0,
            optimization_left_cutoff: 0.0,
            optimization_right_cutoff: 100.0,
            graph_left_cutoff: 0.0,
            graph_right_cutoff: 100.0,
        }
    }

    #[test]
    fn diagonal_line_golden() {
        let mut grid = vec![vec![' '; 4]; 4];
        draw_line(&mut grid, 0, 3, 3, 0, '-');
        let rows: Vec<String> = grid.into_iter().map(|r| r.into_iter().collect()).collect();
        assert_eq!(rows, ["   -", "  - ", " -  ", "-   "]);
    }

    #[test]
    fn plot_has_fixed_shape_and_all_layers() {
        let a = aux();
        let truth = TunableParameters::new(0.5, 10.0, 20.0, 50.0);
        let guess = TunableParameters::new(0.8, 5.0, 30.0, 40.0);
        let times: Vec<f64> = (0..=100).step_by(5).map(|i| i as f64).collect();
        let display = Series::from_columns(&times, &evaluate(&times, &truth, &a));

        let txt = render_fit_plot(&display, &guess, &truth, &a, 60, 20);
        let lines: Vec<&str> = txt.lines().collect();

        assert_eq!(lines.len(), 21);
        assert!(lines[0].starts_with("Plot: t=[0.000, 100.000]"));
        assert!(lines[1..].iter().all(|l| l.chars().count() == 60));
        assert!(txt.contains('o'));
        assert!(txt.contains('+'));
        assert!(txt.contains('-'));
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = aux();
        let p = TunableParameters::new(0.5, 10.0, 20.0, 50.0);
        let display = Series::from_columns(&[0.0, 50.0, 100.0], &[0.0, -1.0, 0.5]);
        assert_eq!(
            render_fit_plot(&display, &p, &p, &a, 30, 8),
            render_fit_plot(&display, &p, &p, &a, 30, 8)
        );
    }
}
