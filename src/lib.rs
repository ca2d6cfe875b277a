#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geom;
pub mod wire;

use std::fmt;
use std::sync::Arc;

use geom::{GeomMesh, PipeOptions, Point3};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;
use wire::{
    AnchorPosition, ControlPointId, DesignConfig, ProjectorOptions, SharedProjector, SurfaceMesh, WireDesign,
    WireDesigner, WireError, WireMaterial, WireSize,
};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            // no-op fallback when panic hook is disabled
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {
    // no-op fallback when debug logs are disabled
}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("kon rayon threadpool niet initialiseren: {err}")))
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

/// Anchor as sent by the viewer: flat arrays instead of point structs.
#[derive(Debug, Clone, Deserialize)]
struct AnchorInput {
    position: [f64; 3],
    #[serde(default)]
    normal: Option<[f64; 3]>,
    #[serde(default = "visible_default")]
    visible: bool,
    #[serde(default)]
    class: wire::ToothClass,
}

fn visible_default() -> bool {
    true
}

impl From<AnchorInput> for AnchorPosition {
    fn from(input: AnchorInput) -> Self {
        let mut anchor = AnchorPosition::new(Point3::from(input.position)).with_class(input.class);
        if let Some(normal) = input.normal {
            anchor = anchor.with_normal(normal.into());
        }
        if !input.visible {
            anchor = anchor.hidden();
        }
        anchor
    }
}

#[derive(Debug, Serialize)]
struct TubeMeshExport {
    vertices: Vec<f64>,
    indices: Vec<u32>,
    normals: Vec<f64>,
    watertight: bool,
    warnings: Vec<String>,
}

impl TubeMeshExport {
    fn new(mesh: &GeomMesh, watertight: bool, warnings: Vec<String>) -> Self {
        Self {
            vertices: mesh.positions_flat(),
            indices: mesh.indices.clone(),
            normals: mesh.normals_flat(),
            watertight,
            warnings,
        }
    }
}

/// Public entry point for consumers.
#[wasm_bindgen]
pub struct WireEngine {
    initialized: bool,
    designer: WireDesigner,
    projector: Option<SharedProjector>,
}

impl Default for WireEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WireEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WireEngine {
        WireEngine {
            initialized: true,
            designer: WireDesigner::default(),
            projector: None,
        }
    }

    /// Geeft terug of de engine de minimale initialisatie heeft doorlopen.
    #[wasm_bindgen]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Huidige stap van de ontwerp-pipeline.
    #[wasm_bindgen]
    pub fn stage(&self) -> String {
        self.designer.stage().to_string()
    }

    /// Vervang de ontwerpinstellingen; ontbrekende velden krijgen hun standaardwaarde.
    #[wasm_bindgen]
    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: DesignConfig = serde_wasm_bindgen::from_value(config).map_err(to_js_error)?;
        self.apply_config(config).map_err(to_js_error)
    }

    /// Kies een draadmateriaal op naam (`niti`, `stainless_steel`, `beta_titanium`).
    #[wasm_bindgen]
    pub fn set_material(&mut self, name: &str) -> Result<(), JsValue> {
        let material =
            WireMaterial::preset(name).ok_or_else(|| js_error(&format!("onbekend materiaal `{name}`")))?;
        self.designer.set_material(Arc::new(material)).map_err(to_js_error)
    }

    /// Stel een eigen materiaal in met volledige eigenschappen.
    #[wasm_bindgen]
    pub fn set_custom_material(&mut self, material: JsValue) -> Result<(), JsValue> {
        let material: WireMaterial = serde_wasm_bindgen::from_value(material).map_err(to_js_error)?;
        self.designer.set_material(Arc::new(material)).map_err(to_js_error)
    }

    /// Kies de draaddikte via het label, bijvoorbeeld `"0.018"` of `"0.016x0.022"`.
    #[wasm_bindgen]
    pub fn set_wire_size(&mut self, label: &str) -> Result<(), JsValue> {
        let size = WireSize::from_label(label).ok_or_else(|| js_error(&format!("onbekende draaddikte `{label}`")))?;
        let mut config = self.designer.config().clone();
        config.wire_size = size;
        self.apply_config(config).map_err(to_js_error)
    }

    /// Laad (of vervang) het tandoppervlak voor projectie; geeft de nieuwe generatie terug.
    #[wasm_bindgen]
    pub fn load_surface_mesh(
        &mut self,
        positions: &[f64],
        indices: &[u32],
        normals: Option<Vec<f64>>,
    ) -> Result<u32, JsValue> {
        let mesh = SurfaceMesh::from_flat(positions, indices, normals.as_deref()).map_err(to_js_error)?;
        let generation = self.load_mesh(mesh).map_err(to_js_error)?;
        Ok(u32::try_from(generation).unwrap_or(u32::MAX))
    }

    /// Ontwerp een draad door de gegeven ankers. `center` is optioneel `[x, y, z]`.
    #[wasm_bindgen]
    pub fn design(&mut self, anchors: JsValue, center: Option<Vec<f64>>) -> Result<JsValue, JsValue> {
        let inputs: Vec<AnchorInput> = serde_wasm_bindgen::from_value(anchors).map_err(to_js_error)?;
        let anchors: Vec<AnchorPosition> = inputs.into_iter().map(AnchorPosition::from).collect();
        let center = parse_center(center.as_deref()).map_err(|msg| js_error(&msg))?;
        let design = self.design_anchors(&anchors, center).map_err(to_js_error)?;
        to_js_value(design)
    }

    /// Verplaats een controlepunt en herbereken het pad.
    #[wasm_bindgen]
    pub fn move_control_point(&mut self, id: usize, x: f64, y: f64, z: f64) -> Result<JsValue, JsValue> {
        let design = self
            .designer
            .move_control_point(ControlPointId::new(id), Point3::new(x, y, z))
            .map_err(to_js_error)?;
        to_js_value(design)
    }

    /// Vergrendel of ontgrendel een controlepunt.
    #[wasm_bindgen]
    pub fn set_control_point_locked(&mut self, id: usize, locked: bool) -> Result<(), JsValue> {
        self.designer
            .set_control_point_locked(ControlPointId::new(id), locked)
            .map_err(to_js_error)
    }

    /// Verhoog of verlaag de draad met een aantal stappen.
    #[wasm_bindgen]
    pub fn adjust_height(&mut self, steps: i32) -> Result<JsValue, JsValue> {
        let design = self.designer.adjust_height(steps).map_err(to_js_error)?;
        to_js_value(design)
    }

    /// Maak de laatste hoogte-aanpassing ongedaan.
    #[wasm_bindgen]
    pub fn undo_height(&mut self) -> Result<JsValue, JsValue> {
        let design = self.designer.undo_height().map_err(to_js_error)?;
        to_js_value(design)
    }

    #[wasm_bindgen]
    pub fn reset_height(&mut self) -> Result<JsValue, JsValue> {
        let design = self.designer.reset_height().map_err(to_js_error)?;
        to_js_value(design)
    }

    /// Verschuif alle ankers binnen hun raakvlak en snap ze terug op het oppervlak.
    #[wasm_bindgen]
    pub fn adjust_anchor_offsets(&mut self, dy: f64, dz: f64) -> Result<JsValue, JsValue> {
        let design = self.designer.adjust_anchor_offsets(dy, dz).map_err(to_js_error)?;
        to_js_value(design)
    }

    /// Haal het laatst afgeronde ontwerp op.
    #[wasm_bindgen]
    pub fn get_design(&self) -> Result<JsValue, JsValue> {
        let design = self
            .designer
            .design()
            .ok_or_else(|| js_error("er is nog geen draad ontworpen"))?;
        to_js_value(design)
    }

    /// Buismesh van de huidige draad voor weergave.
    #[wasm_bindgen]
    pub fn get_tube_mesh(&self, radial_segments: Option<usize>) -> Result<JsValue, JsValue> {
        let export = self.tube_mesh(radial_segments).map_err(|msg| js_error(&msg))?;
        to_js_value(&export)
    }

    /// Geïdealiseerde boogvorm door de ankers als vlakke lijst `[x, y, z, ...]`.
    #[wasm_bindgen]
    pub fn get_ideal_arch(&self, num_points: usize) -> Result<Vec<f64>, JsValue> {
        let curve = self.designer.ideal_arch(num_points).map_err(to_js_error)?;
        Ok(curve.iter().flat_map(|p| p.to_array()).collect())
    }
}

impl WireEngine {
    #[must_use]
    pub fn designer(&self) -> &WireDesigner {
        &self.designer
    }

    pub fn designer_mut(&mut self) -> &mut WireDesigner {
        &mut self.designer
    }

    pub fn apply_config(&mut self, config: DesignConfig) -> Result<(), WireError> {
        config.validate()?;
        if let Some(projector) = self.projector.as_ref() {
            projector.set_options(config.projector);
        }
        self.designer.set_config(config)
    }

    /// Builds the projector on first use and rebuilds it afterwards.
    pub fn load_mesh(&mut self, mesh: SurfaceMesh) -> Result<u64, WireError> {
        if let Some(projector) = self.projector.as_ref() {
            return projector.rebuild(mesh);
        }
        let options: ProjectorOptions = self.designer.config().projector;
        let projector = SharedProjector::build(mesh, options)?;
        let generation = projector.generation();
        self.designer.set_projector(Some(projector.clone()));
        self.projector = Some(projector);
        Ok(generation)
    }

    pub fn design_anchors(
        &mut self,
        anchors: &[AnchorPosition],
        center: Option<Point3>,
    ) -> Result<&WireDesign, WireError> {
        crate::debug_log!("design: {} ankers", anchors.len());
        self.designer.design_from(anchors, center)
    }

    fn tube_mesh(&self, radial_segments: Option<usize>) -> Result<TubeMeshExport, String> {
        let design = self
            .designer
            .design()
            .ok_or_else(|| "er is nog geen draad ontworpen".to_string())?;
        let mut options = PipeOptions::default();
        if let Some(segments) = radial_segments {
            options.radial_segments = segments;
        }
        let (mesh, diagnostics) = design.tube_mesh(options).map_err(|err| err.to_string())?;
        crate::debug_log!("buismesh: {}", diagnostics.summary());
        Ok(TubeMeshExport::new(&mesh, diagnostics.is_watertight(), diagnostics.warnings))
    }
}

fn parse_center(center: Option<&[f64]>) -> Result<Option<Point3>, String> {
    match center {
        None | Some([]) => Ok(None),
        Some(&[x, y, z]) if x.is_finite() && y.is_finite() && z.is_finite() => Ok(Some(Point3::new(x, y, z))),
        Some(&[_, _, _]) => Err("boogcentrum moet eindige coördinaten hebben".to_string()),
        Some(other) => Err(format!("boogcentrum verwacht 3 waarden, kreeg {}", other.len())),
    }
}

fn to_js_value<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|err| JsError::new(&err.to_string()).into())
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::{AnchorInput, TubeMeshExport, WireEngine, parse_center};
    use crate::geom::{GeomMesh, Point3};
    use crate::wire::{AnchorPosition, DesignConfig, DesignStage, ProjectorOptions, SurfaceMesh, ToothClass, WireError};

    #[test]
    fn parse_center_accepts_empty_and_triples() {
        assert_eq!(parse_center(None), Ok(None));
        assert_eq!(parse_center(Some(&[])), Ok(None));
        assert_eq!(
            parse_center(Some(&[1.0, 2.0, 3.0])),
            Ok(Some(Point3::new(1.0, 2.0, 3.0)))
        );
        assert!(parse_center(Some(&[1.0, 2.0])).is_err());
        assert!(parse_center(Some(&[1.0, f64::NAN, 3.0])).is_err());
    }

    #[test]
    fn anchor_input_maps_hidden_and_normals() {
        let input = AnchorInput {
            position: [1.0, 2.0, 3.0],
            normal: Some([0.0, 0.0, 1.0]),
            visible: false,
            class: ToothClass::Molar,
        };
        let anchor = AnchorPosition::from(input);

        assert_eq!(anchor.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(anchor.normal.z, 1.0);
        assert!(!anchor.visible);
        assert_eq!(anchor.class, ToothClass::Molar);
    }

    #[test]
    fn tube_export_flattens_buffers() {
        let mesh = GeomMesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            uvs: None,
            normals: Some(vec![[0.0, 0.0, 1.0]; 3]),
        };
        let export = TubeMeshExport::new(&mesh, false, Vec::new());

        assert_eq!(export.vertices.len(), 9);
        assert_eq!(export.normals.len(), 9);
        assert_eq!(export.indices, vec![0, 1, 2]);
    }

    #[test]
    fn second_mesh_load_rebuilds_the_shared_projector() {
        let mut engine = WireEngine::new();
        let sphere = || SurfaceMesh::uv_sphere(Point3::ORIGIN, 10.0, 8, 16).expect("sphere");

        assert_eq!(engine.load_mesh(sphere()).expect("first"), 1);
        assert_eq!(engine.load_mesh(sphere()).expect("second"), 2);
        assert!(engine.designer().projector().is_some());
        assert_eq!(engine.designer().stage(), DesignStage::Idle);
    }

    #[test]
    fn rejected_config_leaves_projector_options_untouched() {
        let mut engine = WireEngine::new();
        let sphere = SurfaceMesh::uv_sphere(Point3::ORIGIN, 10.0, 8, 16).expect("sphere");
        engine.load_mesh(sphere).expect("mesh");

        let mut config = DesignConfig::default();
        config.projector.search_radius = 12.0;
        config.projector.fan_angle_degrees = f64::NAN;
        assert!(matches!(engine.apply_config(config), Err(WireError::InvalidConfig(_))));

        let projector = engine.designer().projector().expect("projector");
        assert_eq!(*projector.read().options(), ProjectorOptions::default());
        assert_eq!(engine.designer().config().projector, ProjectorOptions::default());
    }

    #[test]
    fn tube_mesh_requires_a_design() {
        let engine = WireEngine::new();
        assert!(engine.tube_mesh(None).is_err());
    }
}
