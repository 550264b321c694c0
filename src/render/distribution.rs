use std::ops::Range;
use std::path::Path;

use log::info;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::TextStyle;

use super::{ensure_font, render_err, FONT_FAMILY};
use crate::color::ClassColors;
use crate::data::model::LabelFrequencies;
use crate::error::Result;
use crate::report::group_thousands;

const BAR_WIDTH: f64 = 0.8;

/// X range spanning every label with room for half a bar on each side.
pub fn class_axis(freq: &LabelFrequencies) -> Range<f64> {
    let mut labels = freq.iter().map(|(v, _)| v.get()).filter(|v| v.is_finite());
    let Some(first) = labels.next() else {
        return 0.0..1.0;
    };
    let (min, max) = labels.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (min - BAR_WIDTH)..(max + BAR_WIDTH)
}

/// Y range tall enough for the largest bar and the count above it.
pub fn count_axis(freq: &LabelFrequencies) -> Range<f64> {
    let top = freq.max_count().max(1) as f64;
    0.0..top * 1.08
}

/// Draw one bar per label value, annotated with its count.
pub fn render_distribution_plot(
    freq: &LabelFrequencies,
    path: &Path,
    size: (u32, u32),
) -> Result<()> {
    ensure_font()?;
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Stimulus class distribution", (FONT_FAMILY, 32).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(100)
        .build_cartesian_2d(class_axis(freq), count_axis(freq))
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Class")
        .y_desc("Number of samples")
        .y_label_formatter(&|v: &f64| group_thousands(v.max(0.0) as u64))
        .draw()
        .map_err(render_err)?;

    let colors = ClassColors::new(freq);
    chart
        .draw_series(freq.iter().map(|(label, count)| {
            let x = label.get();
            Rectangle::new(
                [(x - BAR_WIDTH / 2.0, 0.0), (x + BAR_WIDTH / 2.0, count as f64)],
                colors.color_for(label).filled(),
            )
        }))
        .map_err(render_err)?;

    let offset = freq.max_count() as f64 * 0.01;
    let label_style = TextStyle::from((FONT_FAMILY, 18).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(freq.iter().map(|(label, count)| {
            Text::new(
                group_thousands(count),
                (label.get(), count as f64 + offset),
                label_style.clone(),
            )
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    info!("distribution chart saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_spans_all_labels() {
        let freq = LabelFrequencies::from_values([0.0, 3.0, 17.0, 3.0]);
        let x = class_axis(&freq);
        assert!(x.start < 0.0 && x.end > 17.0);
        let y = count_axis(&freq);
        assert_eq!(y.start, 0.0);
        assert!(y.end > 2.0);
    }

    #[test]
    fn empty_distribution_has_unit_axes() {
        let freq = LabelFrequencies::default();
        assert_eq!(class_axis(&freq), 0.0..1.0);
        assert_eq!(count_axis(&freq), 0.0..1.08);
    }
}
