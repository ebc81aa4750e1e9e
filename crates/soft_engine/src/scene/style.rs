//! Entity rendering styles

use serde::{Deserialize, Serialize};

/// Which primitive kind an entity draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    /// Vertices as screen-space points or sprites
    Point,
    /// Edges as lines
    Wireframe,
    /// Filled polygons
    #[default]
    Solid,
}

/// How primitive colors are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShadeMode {
    /// Flat style color, no lighting
    Plain,
    /// Lambertian plus specular accumulation over the frame's lights
    #[default]
    Lightsource,
    /// Texture blit per point (point drawmode only)
    Sprite,
    /// User render hooks per point (point drawmode only)
    Callback,
}

/// Fill technique for solid polygons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Single fill of the projected outline
    Fill,
    /// Fill twice to strengthen anti-aliased edges
    Filltwice,
    /// Inflate the outline slightly before filling, closing seams between
    /// adjacent polygons
    #[default]
    Inflate,
    /// Fill then stroke the outline in the same color
    Fillstroke,
    /// Fill with the background color, stroke with the entity color
    Hiddenline,
}

/// Coarse painter's-algorithm bucket for a whole entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectSortMode {
    /// Order by the entity's computed average depth
    #[default]
    Sorted,
    /// Always paint last, over everything
    Front,
    /// Always paint first, behind everything
    Back,
}

/// Whether and when an entity's own primitives are depth sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeometrySortMode {
    /// Always sort
    Sorted,
    /// Sort only when overlap matters: solid or lighting-shaded entities
    #[default]
    Automatic,
    /// Never sort
    None,
}

/// Rendering style descriptor for a geometry entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Base color, RGB 0-255
    pub color: [u8; 3],
    /// Phong specular exponent; 0 disables the specular term
    pub specular: f32,
    /// Diffuse reflection multiplier, 0-1
    pub diffuse: f32,
    /// Additive self-illumination, 0-1
    pub emit: f32,
    /// Alpha applied when drawing, 0-1
    pub opacity: f32,
    /// Primitive kind to draw
    pub drawmode: DrawMode,
    /// Color computation mode
    pub shademode: ShadeMode,
    /// Fill technique for solid polygons
    pub fillmode: FillMode,
    /// Coarse painter's-algorithm bucket for the whole entity
    pub objectsortmode: ObjectSortMode,
    /// Whether/how this entity's own primitives are depth sorted
    pub geometrysortmode: GeometrySortMode,
    /// Line width for wireframe edges and point radius, in pixels
    pub linewidth: f32,
    /// Perspective line/point scaling factor; 0 keeps widths constant
    pub linescale: f32,
    /// Disable hidden-surface culling for this entity
    pub doublesided: bool,
    /// Default texture index for textured polygons and point sprites
    pub texture: Option<usize>,
    /// Backend blend mode passthrough
    pub composite_operation: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: [128, 128, 128],
            specular: 0.0,
            diffuse: 1.0,
            emit: 0.0,
            opacity: 1.0,
            drawmode: DrawMode::default(),
            shademode: ShadeMode::default(),
            fillmode: FillMode::default(),
            objectsortmode: ObjectSortMode::default(),
            geometrysortmode: GeometrySortMode::default(),
            linewidth: 1.0,
            linescale: 0.0,
            doublesided: false,
            texture: None,
            composite_operation: None,
        }
    }
}

impl Style {
    /// Style for flat-colored solid geometry
    pub fn plain_solid(color: [u8; 3]) -> Self {
        Self {
            color,
            shademode: ShadeMode::Plain,
            ..Default::default()
        }
    }

    /// Style for wireframe drawing
    pub fn wireframe(color: [u8; 3]) -> Self {
        Self {
            color,
            drawmode: DrawMode::Wireframe,
            shademode: ShadeMode::Plain,
            ..Default::default()
        }
    }

    /// Style for plain point drawing
    pub fn points(color: [u8; 3]) -> Self {
        Self {
            color,
            drawmode: DrawMode::Point,
            shademode: ShadeMode::Plain,
            ..Default::default()
        }
    }

    /// Builder: set the base color
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    /// Builder: set the draw mode
    pub fn with_drawmode(mut self, drawmode: DrawMode) -> Self {
        self.drawmode = drawmode;
        self
    }

    /// Builder: set the shade mode
    pub fn with_shademode(mut self, shademode: ShadeMode) -> Self {
        self.shademode = shademode;
        self
    }

    /// Builder: set the fill mode
    pub fn with_fillmode(mut self, fillmode: FillMode) -> Self {
        self.fillmode = fillmode;
        self
    }

    /// Builder: set opacity
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Builder: set the specular exponent
    pub fn with_specular(mut self, specular: f32) -> Self {
        self.specular = specular;
        self
    }

    /// Builder: set additive emission
    pub fn with_emit(mut self, emit: f32) -> Self {
        self.emit = emit;
        self
    }

    /// Builder: set line width and perspective scaling
    pub fn with_linewidth(mut self, linewidth: f32, linescale: f32) -> Self {
        self.linewidth = linewidth;
        self.linescale = linescale;
        self
    }

    /// Builder: disable hidden-surface culling
    pub fn with_doublesided(mut self) -> Self {
        self.doublesided = true;
        self
    }

    /// Builder: set the default texture index
    pub fn with_texture(mut self, index: usize) -> Self {
        self.texture = Some(index);
        self
    }

    /// Builder: set the object sort bucket
    pub fn with_objectsortmode(mut self, mode: ObjectSortMode) -> Self {
        self.objectsortmode = mode;
        self
    }

    /// Builder: set the primitive sort policy
    pub fn with_geometrysortmode(mut self, mode: GeometrySortMode) -> Self {
        self.geometrysortmode = mode;
        self
    }
}
