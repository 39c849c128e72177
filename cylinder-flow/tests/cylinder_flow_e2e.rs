use cylinder_flow::velocity::ClosedFormCylinder;
use cylinder_flow::{
    compute_field, Config, Domain, Obstacle, QuiverRenderer, RenderContext, StreamFunction, Style,
    VelocityFunctions,
};

fn default_flow() -> (VelocityFunctions, cylinder_flow::FlowField) {
    let velocity = VelocityFunctions::derive(&StreamFunction::cylinder(1.0, 1.0)).unwrap();
    let flow = compute_field(&velocity, Domain::new(-2.5, 2.5, -2.5, 2.5), 19, 16, 1.0).unwrap();
    (velocity, flow)
}

#[test]
fn default_scenario_shapes_and_origin() {
    let (_, flow) = default_flow();
    assert_eq!(flow.grid.x.dim(), (19, 16));
    assert_eq!(flow.grid.y.dim(), (19, 16));
    assert_eq!(flow.field.dim(), (19, 16));
    for (&x, &y) in flow.grid.x.iter().zip(flow.grid.y.iter()) {
        assert!(!(x == 0.0 && y == 0.0), "origin must never be sampled");
    }
}

#[test]
fn flow_past_the_side_of_the_cylinder() {
    let (velocity, flow) = default_flow();

    // u = 1 - R^2/x^2 on the axis
    let (u, v) = velocity.at(2.0, 0.0).unwrap();
    assert!((u - 0.75).abs() < 1e-12);
    assert!(v.abs() < 1e-12);

    // row 9 is y = 0; columns 13 and 14 straddle x = 2
    for col in [13, 14] {
        let (x, y) = flow.grid.point(9, col);
        assert_eq!(y, 0.0);
        assert!(x > 1.5 && x < 2.5);
        let u = flow.field.u.get(9, col).expect("visible outside the cylinder");
        assert!(u > 0.0);
        assert!((u - (1.0 - 1.0 / (x * x))).abs() < 1e-12);
    }

    // a grid that samples (2, 0) exactly
    let flow = compute_field(&velocity, Domain::new(-2.3, 2.0, -1.0, 1.0), 3, 5, 1.0).unwrap();
    let (x, y) = flow.grid.point(1, 4);
    assert!((x - 2.0).abs() < 1e-12 && y == 0.0);
    let u = flow.field.u.get(1, 4).expect("(2, 0) is visible");
    assert!((u - 0.75).abs() < 1e-12);
}

#[test]
fn mask_hides_exactly_the_interior() {
    let (_, flow) = default_flow();
    let (rows, cols) = flow.grid.shape();
    let mut hidden = 0;
    for i in 0..rows {
        for j in 0..cols {
            let (x, y) = flow.grid.point(i, j);
            let inside = x * x + y * y < 1.0;
            assert_eq!(flow.field.u.get(i, j).is_none(), inside);
            assert_eq!(flow.field.v.get(i, j).is_none(), inside);
            // hidden values are kept, not dropped
            assert!(flow.field.u.data()[[i, j]].is_finite());
            hidden += inside as usize;
        }
    }
    assert!(hidden > 0);
    assert_eq!(flow.field.u.visible_count(), rows * cols - hidden);
}

#[test]
fn sampled_field_is_divergence_free() {
    let velocity =
        VelocityFunctions::derive(&StreamFunction::cylinder_with_circulation(1.0, 1.0, 2.0))
            .unwrap();
    let (_, flow) = default_flow();
    let h = 1e-4;
    for (i, j, _, _) in flow.field.visible() {
        let (x, y) = flow.grid.point(i, j);
        if (x * x + y * y).sqrt() < 1.0 + 2.0 * h {
            continue;
        }
        let du_dx = (velocity.at(x + h, y).unwrap().0 - velocity.at(x - h, y).unwrap().0) / (2.0 * h);
        let dv_dy = (velocity.at(x, y + h).unwrap().1 - velocity.at(x, y - h).unwrap().1) / (2.0 * h);
        assert!(
            (du_dx + dv_dy).abs() < 1e-6,
            "divergence {} at ({}, {})",
            du_dx + dv_dy,
            x,
            y
        );
    }
}

#[test]
fn deriving_twice_yields_identical_arrays() {
    let (_, first) = default_flow();
    let (_, second) = default_flow();
    assert_eq!(first.field.u.data(), second.field.u.data());
    assert_eq!(first.field.v.data(), second.field.v.data());
    assert_eq!(first.field, second.field);
}

#[test]
fn symbolic_and_closed_form_sampling_agree() {
    let (_, symbolic) = default_flow();
    let closed = ClosedFormCylinder {
        speed: 1.0,
        radius: 1.0,
        circulation: 0.0,
    };
    let manual = compute_field(&closed, Domain::new(-2.5, 2.5, -2.5, 2.5), 19, 16, 1.0).unwrap();
    assert_eq!(symbolic.field.u.mask(), manual.field.u.mask());
    for (a, b) in symbolic.field.u.data().iter().zip(manual.field.u.data().iter()) {
        assert!((a - b).abs() < 1e-10);
    }
    for (a, b) in symbolic.field.v.data().iter().zip(manual.field.v.data().iter()) {
        assert!((a - b).abs() < 1e-10);
    }
}

#[test]
fn singular_grid_aborts_with_error() {
    let velocity = VelocityFunctions::derive(&StreamFunction::cylinder(1.0, 1.0)).unwrap();
    let err = compute_field(&velocity, Domain::new(-2.5, 2.5, -2.5, 2.5), 19, 19, 1.0).unwrap_err();
    assert!(err.to_string().contains("origin"));
}

#[test]
fn config_drives_full_pipeline_to_png() {
    let path = std::env::temp_dir().join("cylinder_flow_e2e.png");
    let toml = format!(
        "[output]\npath = {:?}\nwidth_in = 2.0\nheight_in = 2.0\ndpi = 60\n\n[style]\ntitle = \"\"\nsubtitle = \"\"\nfooter = \"\"\ncolormap = \"turbo\"\n",
        path.display().to_string()
    );
    let config = Config::from_toml(&toml).unwrap();

    let velocity = VelocityFunctions::derive(&config.flow.stream_function()).unwrap();
    let flow = compute_field(
        &velocity,
        config.grid.domain(),
        config.grid.rows,
        config.grid.cols,
        config.flow.radius,
    )
    .unwrap();
    let renderer = QuiverRenderer::new(config.style.style().unwrap());
    let ctx = config.output.render_context();
    assert_eq!(ctx.size(), (120, 120));
    renderer
        .render(&ctx, &flow.grid, &flow.field, &config.flow.obstacle())
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn svg_output_by_extension() {
    let (_, flow) = default_flow();
    let path = std::env::temp_dir().join("cylinder_flow_e2e.svg");
    let ctx = RenderContext::new(&path, 150, 150);
    QuiverRenderer::new(Style::default())
        .render(&ctx, &flow.grid, &flow.field, &Obstacle::new((0.0, 0.0), 1.0))
        .unwrap();
    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.contains("<svg"));
    let _ = std::fs::remove_file(&path);
}
