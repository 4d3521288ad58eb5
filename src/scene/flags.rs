use bon::bon;

/// Scene wide settings that control how geometries are committed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SceneFlags {
    interpolate: bool,
    dynamic: bool,
    need_triangle_indices: bool,
    need_triangle_vertices: bool,
}

#[bon]
impl SceneFlags {
    #[builder]
    pub fn new(
        // Allow attribute interpolation on committed geometries
        #[builder(default)]
        interpolate: bool,
        // Geometries keep all their buffers after commit
        #[builder(default)]
        dynamic: bool,
        #[builder(default = true)] need_triangle_indices: bool,
        #[builder(default = true)] need_triangle_vertices: bool,
    ) -> Self {
        SceneFlags {
            interpolate,
            dynamic,
            need_triangle_indices,
            need_triangle_vertices,
        }
    }
}

impl SceneFlags {
    pub fn interpolate(&self) -> bool {
        self.interpolate
    }

    pub fn dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn need_triangle_indices(&self) -> bool {
        self.need_triangle_indices
    }

    pub fn need_triangle_vertices(&self) -> bool {
        self.need_triangle_vertices
    }
}

impl Default for SceneFlags {
    fn default() -> Self {
        SceneFlags::builder().build()
    }
}
