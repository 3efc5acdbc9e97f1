//! Publication figures rendered to SVG with Plotters.
//!
//! Every figure is split into a data-prep step (pure, testable) and a draw step
//! that only turns prepared series into Plotters primitives:
//!
//! 1. `fig1_phi_vs_noise`: Φ vs noise amplitude, one line per system size
//! 2. `fig2_stochastic_resonance`: the resonance fit over the XLarge cohort
//! 3. `fig3_system_scaling`: Φ per system size at the optimal noise level
//! 4. `fig4_baseline_comparison`: XLarge pure state vs optimal noise

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use tracing::info;

use crate::data::{at_noise_level, cohort, find_record};
use crate::domain::{
    BASELINE_NOISE_LEVEL, CohortFit, OPTIMAL_NOISE_LEVEL, ResultsFile, SystemSize,
};
use crate::error::AppError;
use crate::models::sample_curve;
use crate::plot::style::FigureStyle;

pub const FIG1: &str = "fig1_phi_vs_noise";
pub const FIG2: &str = "fig2_stochastic_resonance";
pub const FIG3: &str = "fig3_system_scaling";
pub const FIG4: &str = "fig4_baseline_comparison";

/// Fitted curve domain and resolution for the resonance figure.
const FIT_CURVE_X_MAX: f64 = 22.0;
const FIT_CURVE_POINTS: usize = 200;

const Y_AXIS_LABEL: &str = "Maximum Φ (bits)";
const X_AXIS_LABEL: &str = "Noise Amplitude (ε)";

/// One line of figure 1.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseSeries {
    pub size: SystemSize,
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// One bar of figures 3 and 4.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    /// Annotation drawn above the bar.
    pub note: String,
}

/// Render all four figures into `out_dir`; returns the written paths.
pub fn render_all(
    results: &ResultsFile,
    resonance: &CohortFit,
    out_dir: &Path,
    style: &FigureStyle,
) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(out_dir).map_err(|e| {
        AppError::io(format!("Failed to create output directory '{}': {e}", out_dir.display()))
    })?;

    let path = |name: &str| out_dir.join(format!("{name}.svg"));
    let fig1 = path(FIG1);
    let fig2 = path(FIG2);
    let fig3 = path(FIG3);
    let fig4 = path(FIG4);

    let series = noise_series(results);
    wrap(FIG1, draw_phi_vs_noise(&fig1, &series, style))?;
    wrap(FIG2, draw_resonance(&fig2, resonance, style))?;

    let scaling = scaling_bars(results);
    if scaling.is_empty() {
        return Err(AppError::data(format!(
            "No records at noise level '{OPTIMAL_NOISE_LEVEL}' for the scaling figure."
        )));
    }
    wrap(FIG3, draw_scaling(&fig3, &scaling_caption(results), &scaling, style))?;

    let comparison = baseline_bars(results)?;
    let caption = comparison_caption(results)?;
    wrap(FIG4, draw_baseline_comparison(&fig4, &caption, &comparison, style))?;

    let written = vec![fig1, fig2, fig3, fig4];
    for p in &written {
        info!(path = %p.display(), "wrote figure");
    }
    Ok(written)
}

fn wrap(name: &str, result: Result<(), Box<dyn Error>>) -> Result<(), AppError> {
    result.map_err(|e| AppError::render(format!("Failed to render {name}: {e}")))
}

/// Per-size `(ε, Φ_max)` lines; sizes with no records are skipped.
pub fn noise_series(results: &ResultsFile) -> Vec<NoiseSeries> {
    SystemSize::ALL
        .iter()
        .filter_map(|&size| {
            let records = cohort(results, size);
            let first = records.first()?;
            Some(NoiseSeries {
                size,
                label: format!("{size} (n={})", first.effective_neurons),
                points: records.iter().map(|r| (r.noise_amplitude, r.max_phi)).collect(),
            })
        })
        .collect()
}

/// Bars at the optimal noise level, in file order.
pub fn scaling_bars(results: &ResultsFile) -> Vec<Bar> {
    at_noise_level(results, OPTIMAL_NOISE_LEVEL)
        .into_iter()
        .map(|r| Bar {
            label: format!("{} (n={})", r.system_size, r.effective_neurons),
            value: r.max_phi,
            note: format!("{:.4}", r.max_phi),
        })
        .collect()
}

/// Figure 3 title, naming the amplitude of the optimal noise level.
pub fn scaling_caption(results: &ResultsFile) -> String {
    match at_noise_level(results, OPTIMAL_NOISE_LEVEL).first() {
        Some(r) => format!("Scaling of Φ at Optimal Noise (ε = {:.1})", r.noise_amplitude),
        None => format!("Scaling of Φ at Optimal Noise ({OPTIMAL_NOISE_LEVEL})"),
    }
}

/// Figure 4 title with the joint state count of the XLarge system (3 states per neuron).
pub fn comparison_caption(results: &ResultsFile) -> Result<String, AppError> {
    let record = find_record(results, SystemSize::XLarge, OPTIMAL_NOISE_LEVEL)?;
    let states = u32::try_from(record.effective_neurons)
        .ok()
        .and_then(|n| 3u64.checked_pow(n));
    Ok(match states {
        Some(states) => format!("Pure vs Mixed Quantum States (XLarge System, {states} states)"),
        None => "Pure vs Mixed Quantum States (XLarge System)".to_string(),
    })
}

fn phi_note(value: f64) -> String {
    if value == 0.0 {
        "Φ = 0.0000 (exactly zero)".to_string()
    } else {
        format!("Φ = {value:.4}")
    }
}

/// XLarge pure state vs optimal noise.
pub fn baseline_bars(results: &ResultsFile) -> Result<[Bar; 2], AppError> {
    let baseline = find_record(results, SystemSize::XLarge, BASELINE_NOISE_LEVEL)?;
    let optimal = find_record(results, SystemSize::XLarge, OPTIMAL_NOISE_LEVEL)?;
    Ok([
        Bar {
            label: format!("Pure State (ε = {:.1})", baseline.noise_amplitude),
            value: baseline.max_phi,
            note: phi_note(baseline.max_phi),
        },
        Bar {
            label: format!("Mixed State (ε = {:.1})", optimal.noise_amplitude),
            value: optimal.max_phi,
            note: phi_note(optimal.max_phi),
        },
    ])
}

fn draw_phi_vs_noise(path: &Path, series: &[NoiseSeries], style: &FigureStyle) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Integrated Information vs Noise Amplitude", style.font(style.caption_size))
        .margin(style.margin)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..21.0f64, -0.002f64..0.042f64)?;

    configure_mesh(&mut chart, style, X_AXIS_LABEL, Y_AXIS_LABEL)?;

    for s in series {
        let color = style.color(s.size as usize);
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
            .label(s.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(s.points.iter().map(|&(x, y)| Circle::new((x, y), 4, color.filled())))?;
    }

    // Pure-state marker at the origin.
    let note_style = style.font(style.annotation_size).into_font().color(&RGBColor(128, 128, 128));
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(2.0, 0.005), (0.1, 0.0003)],
        RGBColor(128, 128, 128).stroke_width(1),
    )))?;
    chart.draw_series(std::iter::once(Text::new(
        "Φ = 0 (pure state)".to_string(),
        (2.0, 0.0055),
        note_style,
    )))?;

    draw_legend(&mut chart, style)?;
    root.present()?;
    Ok(())
}

fn draw_resonance(path: &Path, fit: &CohortFit, style: &FigureStyle) -> Result<(), Box<dyn Error>> {
    let params = fit.outcome.params();
    let opt = fit.outcome.optimum();
    let curve = sample_curve(&params, 0.0, FIT_CURVE_X_MAX, FIT_CURVE_POINTS);

    let x_max = fit
        .observations
        .iter()
        .map(|o| o.x)
        .fold(FIT_CURVE_X_MAX, f64::max);
    let ys = fit
        .observations
        .iter()
        .map(|o| o.y)
        .chain(curve.iter().map(|&(_, y)| y))
        .chain(std::iter::once(opt.value))
        .filter(|y| y.is_finite());
    let (y_lo, y_hi) = ys.fold((0.0f64, 0.0f64), |(lo, hi), y| (lo.min(y), hi.max(y)));
    let pad = ((y_hi - y_lo) * 0.15).max(1e-3);
    let (y0, y1) = (y_lo - pad * 0.3, y_hi + pad);

    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Stochastic Resonance in Integrated Information", style.font(style.caption_size))
        .margin(style.margin)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..x_max, y0..y1)?;

    configure_mesh(&mut chart, style, X_AXIS_LABEL, Y_AXIS_LABEL)?;

    let observed = style.color(3);
    chart
        .draw_series(fit.observations.iter().map(|o| Circle::new((o.x, o.y), 6, observed.filled())))?
        .label("Experimental")
        .legend(move |(x, y)| Circle::new((x + 10, y), 5, observed.filled()));

    chart
        .draw_series(LineSeries::new(curve.iter().copied(), BLACK.stroke_width(2)))?
        .label(format!("Fit: R² = {:.3}", fit.outcome.r_squared()))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    // Dashed vertical line through the optimum.
    let green = RGBColor(0, 128, 0);
    let dashes = 40;
    let dash = (y1 - y0) / dashes as f64;
    chart.draw_series((0..dashes).step_by(2).map(|k| {
        let ya = y0 + k as f64 * dash;
        PathElement::new(vec![(opt.location, ya), (opt.location, ya + dash)], green.mix(0.7).stroke_width(2))
    }))?;

    chart.draw_series(std::iter::once(Circle::new((opt.location, opt.value), 7, green.filled())))?;
    chart.draw_series(std::iter::once(Cross::new((opt.location, opt.value), 10, green.stroke_width(2))))?;
    chart.draw_series(std::iter::once(Text::new(
        format!("ε_opt = {:.2}", opt.location),
        (opt.location + 3.0, opt.value + pad * 0.3),
        style.font(style.annotation_size).into_font().color(&green),
    )))?;

    draw_legend(&mut chart, style)?;

    // Model formula in the lower right of the canvas.
    let (w, h) = (style.width as i32, style.height as i32);
    root.draw(&Text::new(
        "Φ(ε) = a·ε·exp(−b·ε²) + c",
        (w - 330, h - 140),
        style.font(style.annotation_size).into_font().color(&BLACK),
    ))?;

    root.present()?;
    Ok(())
}

fn draw_scaling(path: &Path, caption: &str, bars: &[Bar], style: &FigureStyle) -> Result<(), Box<dyn Error>> {
    let y_max = bars.iter().map(|b| b.value).fold(0.01f64, f64::max) * 1.25;
    draw_bars(path, caption, "Maximum Φ (bits)", bars, y_max, style, |i| style.color(i))
}

fn draw_baseline_comparison(
    path: &Path,
    caption: &str,
    bars: &[Bar; 2],
    style: &FigureStyle,
) -> Result<(), Box<dyn Error>> {
    let y_max = bars.iter().map(|b| b.value).fold(0.045f64, |acc, v| acc.max(v * 1.15));
    let colors = [RGBColor(0x34, 0x98, 0xdb), RGBColor(0xe7, 0x4c, 0x3c)];
    draw_bars(
        path,
        caption,
        "Φ (bits)",
        bars,
        y_max,
        style,
        |i| colors[i % colors.len()],
    )
}

fn draw_bars(
    path: &Path,
    caption: &str,
    y_desc: &str,
    bars: &[Bar],
    y_max: f64,
    style: &FigureStyle,
    color_of: impl Fn(usize) -> RGBColor,
) -> Result<(), Box<dyn Error>> {
    let n = bars.len().max(1);
    let labels: Vec<String> = bars.iter().map(|b| b.label.clone()).collect();

    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, style.font(style.caption_size))
        .margin(style.margin)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0.0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| bar_label(&labels, *v))
        .y_desc(y_desc)
        .axis_desc_style(style.font(style.label_size))
        .label_style(style.font(style.tick_size))
        .bold_line_style(BLACK.mix(style.grid_alpha))
        .light_line_style(BLACK.mix(style.grid_alpha * 0.3))
        .draw()?;

    for (i, bar) in bars.iter().enumerate() {
        let x = i as f64;
        let corners = [(x - 0.3, 0.0), (x + 0.3, bar.value)];
        chart.draw_series(std::iter::once(Rectangle::new(corners, color_of(i).filled())))?;
        chart.draw_series(std::iter::once(Rectangle::new(corners, BLACK.stroke_width(1))))?;
        chart.draw_series(std::iter::once(Text::new(
            bar.note.clone(),
            (x - 0.2, bar.value + y_max * 0.05),
            style.font(style.annotation_size),
        )))?;
    }

    root.present()?;
    Ok(())
}

/// Tick label for the bar nearest to `v`; empty between bars.
fn bar_label(labels: &[String], v: f64) -> String {
    let i = v.round();
    if (v - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

type SvgChart<'a, 'b> = ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn configure_mesh(
    chart: &mut SvgChart<'_, '_>,
    style: &FigureStyle,
    x_desc: &str,
    y_desc: &str,
) -> Result<(), Box<dyn Error>> {
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(style.font(style.label_size))
        .label_style(style.font(style.tick_size))
        .bold_line_style(BLACK.mix(style.grid_alpha))
        .light_line_style(BLACK.mix(style.grid_alpha * 0.3))
        .draw()?;
    Ok(())
}

fn draw_legend<'a, 'b: 'a>(chart: &mut SvgChart<'a, 'b>, style: &FigureStyle) -> Result<(), Box<dyn Error>> {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .label_font(style.font(style.tick_size))
        .draw()?;
    Ok(())
}
