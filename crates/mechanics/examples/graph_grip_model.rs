use mechanics::surface::SurfaceCatalog;
use mechanics::torque_curve::TorqueCurve;
use mechanics::wheel::GripConfig;
use plotters::prelude::*;

fn draw_series(
    filename: &str,
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[(&str, Vec<(f64, f64)>)],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let points = series.iter().flat_map(|(_, s)| s.iter());
    let (x_max, y_max) = points.fold((0.0f64, 0.0f64), |(x, y), &(px, py)| (x.max(px), y.max(py)));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("Arial", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max * 1.1)?;

    chart.configure_mesh().x_desc(x_label).y_desc(y_label).draw()?;

    for (i, (label, points)) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(points.iter().cloned(), &color))?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.filled()));
    }

    chart.configure_series_labels().border_style(&BLACK).draw()?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let grip = GripConfig::default();
    let catalog = SurfaceCatalog::reference()?;

    // 1) Sideways stiffness vs slip, one line per surface
    let slips: Vec<f64> = (0..=150).map(|i| i as f64 * 0.01).collect();
    let per_surface: Vec<(&str, Vec<(f64, f64)>)> = catalog
        .profiles()
        .iter()
        .map(|profile| {
            let points = slips
                .iter()
                .map(|&slip| (slip, grip.dynamic_grip(slip) * profile.sideways_grip))
                .collect();
            (profile.id.as_str(), points)
        })
        .collect();
    draw_series(
        "grip_vs_slip.png",
        "Sideways stiffness vs slip",
        "Slip",
        "Stiffness",
        &per_surface,
    )?;

    // 2) Torque factor across the rev band
    let curve = TorqueCurve::default();
    let torque: Vec<(f64, f64)> = (0..=100)
        .map(|i| {
            let rpm01 = i as f64 / 100.0;
            (rpm01, curve.evaluate(rpm01))
        })
        .collect();
    draw_series(
        "torque_curve.png",
        "Engine torque curve",
        "Normalized RPM",
        "Torque factor",
        &[("torque", torque)],
    )?;

    println!("Wrote grip_vs_slip.png and torque_curve.png");
    Ok(())
}
