#[cfg(target_arch = "wasm32")]
fn main() {
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("wire_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use archwire_engine::geom::{GeomMesh, GeomMeshDiagnostics, PipeOptions, Point3, Vec3};
    use archwire_engine::wire::{
        AnchorPosition, ArchKind, DesignConfig, PathStrategy, ProjectorOptions, SharedProjector, SurfaceMesh,
        WireDesign, WireDesigner, WireMaterial,
    };
    use std::fs::{self, File};
    use std::io::{self, BufWriter, Write};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    const USAGE: &str = r#"wire_cli (archwire-engine)

USAGE:
  wire_cli list
  wire_cli run <scenario|all> [options]

OPTIONS (run):
  --strategy <name>  Path strategy (catmull_rom, cubic_spline, b_spline, physics_based, linear)
  --material <name>  Wire material preset (niti, stainless_steel, beta_titanium)
  --out-dir <dir>    Write <scenario>.obj (tube plus centreline) to this dir
  --bends            Print every bend of the finished design
  --overwrite        Overwrite existing OBJ files
  -h, --help         Show this help
"#;

    type Build = fn(&Overrides) -> Result<Session, String>;

    /// Named demo designs; `run all` walks them in order.
    const SCENARIOS: &[(&str, Build)] = &[
        ("minimal_arch", minimal_arch),
        ("full_arch", full_arch),
        ("degenerate_line", degenerate_line),
        ("tight_material", tight_material),
        ("surface_snap", surface_snap),
    ];

    pub fn run() -> Result<(), String> {
        let mut args = std::env::args().skip(1);
        match args.next().as_deref() {
            None | Some("-h" | "--help" | "help") => {
                println!("{USAGE}");
                Ok(())
            }
            Some("list") => {
                for (name, _) in SCENARIOS {
                    println!("{name}");
                }
                Ok(())
            }
            Some("run") => {
                let target = args.next().ok_or("missing scenario name")?;
                let Some(options) = RunOptions::parse(args)? else {
                    println!("{USAGE}");
                    return Ok(());
                };
                let selected: Vec<&(&str, Build)> = if target == "all" {
                    SCENARIOS.iter().collect()
                } else {
                    let found = SCENARIOS.iter().find(|(name, _)| *name == target);
                    vec![found.ok_or_else(|| unknown_scenario(&target))?]
                };
                for (name, build) in selected {
                    run_scenario(name, *build, &options)?;
                }
                Ok(())
            }
            Some(other) => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    /// Strategy and material forced onto every scenario.
    #[derive(Debug, Clone, Default)]
    struct Overrides {
        strategy: Option<PathStrategy>,
        material: Option<WireMaterial>,
    }

    #[derive(Debug, Default)]
    struct RunOptions {
        overrides: Overrides,
        out_dir: Option<PathBuf>,
        print_bends: bool,
        overwrite: bool,
    }

    impl RunOptions {
        /// `None` when help was requested.
        fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, String> {
            let mut options = Self::default();
            while let Some(flag) = args.next() {
                let mut value = || args.next().ok_or_else(|| format!("missing value for {flag}"));
                match flag.as_str() {
                    "--strategy" => {
                        let name = value()?;
                        let strategy =
                            PathStrategy::from_name(&name).ok_or_else(|| format!("unknown strategy `{name}`"))?;
                        options.overrides.strategy = Some(strategy);
                    }
                    "--material" => {
                        let name = value()?;
                        let material =
                            WireMaterial::preset(&name).ok_or_else(|| format!("unknown material `{name}`"))?;
                        options.overrides.material = Some(material);
                    }
                    "--out-dir" => options.out_dir = Some(PathBuf::from(value()?)),
                    "--bends" => options.print_bends = true,
                    "--overwrite" => options.overwrite = true,
                    "-h" | "--help" => return Ok(None),
                    other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
                }
            }
            Ok(Some(options))
        }
    }

    fn unknown_scenario(name: &str) -> String {
        let names: Vec<&str> = SCENARIOS.iter().map(|(name, _)| *name).collect();
        format!("unknown scenario `{name}` (available: {})", names.join(", "))
    }

    /// A configured designer plus the anchors it should design.
    struct Session {
        designer: WireDesigner,
        anchors: Vec<AnchorPosition>,
        center: Option<Point3>,
    }

    fn run_scenario(name: &str, build: Build, options: &RunOptions) -> Result<(), String> {
        let mut session = build(&options.overrides)?;
        let design = session
            .designer
            .design_from(&session.anchors, session.center)
            .map_err(|e| format!("{name}: {e}"))?;
        let (mesh, diagnostics) = design
            .tube_mesh(PipeOptions::default())
            .map_err(|e| format!("{name}: tube: {e}"))?;

        print_statistics(name, design, &diagnostics);
        if options.print_bends {
            print_bends(design);
        }

        if let Some(dir) = options.out_dir.as_deref() {
            let path = dir.join(format!("{name}.obj"));
            export_obj(&path, name, design, &mesh, options.overwrite)?;
            eprintln!("wrote {}", path.display());
        }
        Ok(())
    }

    fn print_statistics(name: &str, design: &WireDesign, diagnostics: &GeomMeshDiagnostics) {
        let stats = &design.statistics;
        println!(
            "{name}: {} {} {} | points={} control={} length={:.3}mm",
            design.strategy,
            stats.material,
            design.wire_size.label(),
            stats.point_count,
            stats.control_point_count,
            stats.length,
        );
        let min_radius = stats
            .min_bend_radius
            .map_or_else(|| "-".to_string(), |r| format!("{r:.3}mm"));
        println!(
            "  bends={} invalid={} max_stress={:.3} min_radius={min_radius} | tube {}",
            stats.bend_count,
            stats.invalid_bends,
            stats.max_stress_factor,
            diagnostics.summary(),
        );
        for warning in &design.warnings {
            println!("  warning: {warning}");
        }
        if let Some(timing) = design.timing.as_ref() {
            println!("  pipeline {:.3} ms", timing.total_ms());
        }
    }

    fn print_bends(design: &WireDesign) {
        for bend in &design.bends {
            println!(
                "  bend #{:<3} at {:>8.3}mm  angle {:>6.2}°  radius {:>8.3}mm  {}",
                bend.index,
                bend.arc_length,
                bend.angle_degrees,
                bend.radius,
                if bend.is_valid { "ok" } else { "TOO TIGHT" },
            );
        }
    }

    /// Writes the tube as object `tube` and the wire centreline as a polyline
    /// object `path`, both in one OBJ file.
    fn export_obj(path: &Path, name: &str, design: &WireDesign, mesh: &GeomMesh, overwrite: bool) -> Result<(), String> {
        mesh.validate().map_err(|e| format!("{name}: invalid tube mesh: {e}"))?;
        if path.exists() && !overwrite {
            return Err(format!("{} exists (pass --overwrite)", path.display()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }

        let write = || -> io::Result<()> {
            let mut out = BufWriter::new(File::create(path)?);
            writeln!(out, "# {name}: {} ({})", design.strategy, design.statistics.material)?;

            writeln!(out, "o tube")?;
            for [x, y, z] in &mesh.positions {
                writeln!(out, "v {x} {y} {z}")?;
            }
            let normals = mesh.normals.as_deref().unwrap_or_default();
            for [x, y, z] in normals {
                writeln!(out, "vn {x} {y} {z}")?;
            }
            for tri in mesh.indices.chunks_exact(3) {
                let [a, b, c] = [tri[0] + 1, tri[1] + 1, tri[2] + 1];
                if normals.is_empty() {
                    writeln!(out, "f {a} {b} {c}")?;
                } else {
                    writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?;
                }
            }

            writeln!(out, "o path")?;
            for p in &design.points {
                writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
            }
            let first = mesh.positions.len() + 1;
            let indices: Vec<String> = (first..first + design.points.len()).map(|i| i.to_string()).collect();
            writeln!(out, "l {}", indices.join(" "))?;
            out.flush()
        };
        write().map_err(|e| format!("write {}: {e}", path.display()))
    }

    /// Anchors on a half ellipse with semi-axes `a` (x) and `b` (y).
    fn arch_anchors(count: usize, a: f64, b: f64) -> Vec<AnchorPosition> {
        (0..count)
            .map(|i| {
                let t = std::f64::consts::PI * (i as f64 + 0.5) / count as f64;
                let normal = Vec3::new(t.cos() / a, t.sin() / b, 0.0).normalized_or_zero();
                AnchorPosition::new(Point3::new(a * t.cos(), b * t.sin(), 0.0)).with_normal(normal)
            })
            .collect()
    }

    fn session(
        mut config: DesignConfig,
        material: WireMaterial,
        overrides: &Overrides,
        anchors: Vec<AnchorPosition>,
    ) -> Result<Session, String> {
        if let Some(strategy) = overrides.strategy {
            config.strategy = strategy;
        }
        let material = overrides.material.clone().unwrap_or(material);
        let designer = WireDesigner::new(config, Arc::new(material)).map_err(|e| e.to_string())?;
        Ok(Session {
            designer,
            anchors,
            center: None,
        })
    }

    fn minimal_arch(overrides: &Overrides) -> Result<Session, String> {
        let anchors = [(10.0, 0.0), (5.0, 8.0), (-5.0, 8.0), (-10.0, 0.0)]
            .into_iter()
            .map(|(x, y)| AnchorPosition::new(Point3::new(x, y, 5.0)))
            .collect();
        let mut s = session(DesignConfig::default(), WireMaterial::niti(), overrides, anchors)?;
        s.center = Some(Point3::new(0.0, 4.0, 0.0));
        Ok(s)
    }

    fn full_arch(overrides: &Overrides) -> Result<Session, String> {
        let config = DesignConfig {
            resolution: 200,
            ..DesignConfig::default()
        };
        session(config, WireMaterial::niti(), overrides, arch_anchors(14, 25.0, 22.0))
    }

    fn degenerate_line(overrides: &Overrides) -> Result<Session, String> {
        let anchors = (0..5)
            .map(|i| AnchorPosition::new(Point3::new(f64::from(i) * 8.0, 0.0, 0.0)))
            .collect();
        let config = DesignConfig {
            intermediate_inset: 0.0,
            ..DesignConfig::default()
        };
        let mut s = session(config, WireMaterial::niti(), overrides, anchors)?;
        s.center = Some(Point3::new(16.0, -40.0, 0.0));
        Ok(s)
    }

    fn tight_material(overrides: &Overrides) -> Result<Session, String> {
        let config = DesignConfig {
            bend_threshold_degrees: 1.0,
            enforce_min_bend_radius: false,
            ..DesignConfig::default()
        };
        let material = WireMaterial::stainless_steel().with_min_bend_radius(40.0);
        session(config, material, overrides, arch_anchors(10, 22.0, 18.0))
    }

    fn surface_snap(overrides: &Overrides) -> Result<Session, String> {
        let projector_options = ProjectorOptions {
            search_radius: 12.0,
            ..ProjectorOptions::default()
        };
        let mesh = SurfaceMesh::uv_sphere(Point3::new(0.0, 8.0, 0.0), 22.0, 32, 64).map_err(|e| e.to_string())?;
        let projector = SharedProjector::build(mesh, projector_options).map_err(|e| e.to_string())?;
        let config = DesignConfig {
            surface_constrained: true,
            arch: ArchKind::Upper,
            ..DesignConfig::default()
        };
        let mut s = session(config, WireMaterial::niti(), overrides, arch_anchors(8, 24.0, 20.0))?;
        s.designer.set_projector(Some(projector));
        Ok(s)
    }
}
