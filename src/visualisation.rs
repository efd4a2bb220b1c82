// src/visualisation.rs

use plotters::prelude::*;

/// Plot the demagnetising field components along a probe line.
/// `coords` are the probe coordinates (same units as the axis label),
/// `h` the sampled field vectors; undefined probe points must already be
/// filtered out by the caller.
pub fn save_h_demag_plot(
    coords: &[f64],
    h: &[[f64; 3]],
    x_label: &str,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // Nothing (or only one point) to plot
    if coords.len() < 2 || h.len() < 2 {
        return Ok(());
    }

    let x_min = *coords.first().unwrap();
    let x_max = *coords.last().unwrap();

    // --- find global y-range over all components ---
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for v in h {
        for &c in v {
            if c.is_finite() {
                if c < y_min {
                    y_min = c;
                }
                if c > y_max {
                    y_max = c;
                }
            }
        }
    }

    // Handle pathological case (all zero or NaN)
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = -1.0;
        y_max = 1.0;
    } else if (y_max - y_min).abs() < 1e-30 {
        // all values essentially identical; broaden the window
        let delta = if y_max.abs() < 1e-30 {
            1.0
        } else {
            0.1 * y_max.abs()
        };
        y_min -= delta;
        y_max += delta;
    } else {
        // add a 10% margin around the data range
        let margin = 0.1 * (y_max - y_min);
        y_min -= margin;
        y_max += margin;
    }

    // ---------- choose a 10^n scaling for nicer axes ----------
    let magnitude = y_max.abs().max(y_min.abs());
    let (scale, y_label): (f64, String) = if magnitude > 0.0 {
        let exp = magnitude.log10().floor() as i32;
        let scale = 10f64.powi(exp);
        if exp == 0 {
            (1.0, "h_demag (A/m)".to_string())
        } else {
            (scale, format!("h_demag (A/m × 10^{})", exp))
        }
    } else {
        (1.0, "h_demag (A/m)".to_string())
    };

    let y_min_scaled = y_min / scale;
    let y_max_scaled = y_max / scale;

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Demagnetising field along the probe line", ("sans-serif", 30))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min_scaled..y_max_scaled)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_labels(10)
        .y_labels(10)
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    // ---- draw each component + legend entry, with scaling ----
    chart
        .draw_series(LineSeries::new(
            coords.iter().zip(h.iter()).map(|(&x, v)| (x, v[0] / scale)),
            &RED,
        ))?
        .label("h_demag_x")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .draw_series(LineSeries::new(
            coords.iter().zip(h.iter()).map(|(&x, v)| (x, v[1] / scale)),
            &GREEN,
        ))?
        .label("h_demag_y")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREEN));

    chart
        .draw_series(LineSeries::new(
            coords.iter().zip(h.iter()).map(|(&x, v)| (x, v[2] / scale)),
            &BLUE,
        ))?
        .label("h_demag_z")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Plot a scalar field profile (rho or phi) along a probe line.
pub fn save_scalar_profile_plot(
    coords: &[f64],
    values: &[f64],
    field_label: &str,
    x_label: &str,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if coords.len() < 2 || values.len() < 2 {
        return Ok(());
    }

    let x_min = *coords.first().unwrap();
    let x_max = *coords.last().unwrap();

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            if v < y_min {
                y_min = v;
            }
            if v > y_max {
                y_max = v;
            }
        }
    }

    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = -1.0;
        y_max = 1.0;
    } else if (y_max - y_min).abs() < 1e-30 {
        let delta = if y_max.abs() < 1e-30 {
            1.0
        } else {
            0.1 * y_max.abs()
        };
        y_min -= delta;
        y_max += delta;
    } else {
        let margin = 0.1 * (y_max - y_min);
        y_min -= margin;
        y_max += margin;
    }

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(
            format!("{} along the probe line", field_label),
            ("sans-serif", 30),
        )
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(field_label)
        .draw()?;

    chart.draw_series(LineSeries::new(
        coords.iter().zip(values.iter()).map(|(&x, &v)| (x, v)),
        &BLACK,
    ))?;

    root.present()?;
    Ok(())
}
