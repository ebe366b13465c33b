/// CPU-side vertex staging owned by one renderer and reused every frame.
///
/// The backing storage only grows. [`VertexScratch::reserve_elements`] is
/// called once per frame before any writes; the steady-state path then
/// writes in place without allocating.
#[derive(Debug, Clone)]
pub struct VertexScratch {
    data: Vec<f32>,
    len: usize,
    floats_per_vertex: usize,
}

impl VertexScratch {
    #[must_use]
    pub fn new(floats_per_vertex: usize, initial_floats: usize) -> Self {
        Self {
            data: vec![0.0; initial_floats],
            len: 0,
            floats_per_vertex: floats_per_vertex.max(1),
        }
    }

    /// Makes room for `elements` items of `vertices_per_element` vertices.
    /// When too small, grows to one and a half times the requested element
    /// count. Returns `true` if storage was reallocated.
    pub fn reserve_elements(&mut self, elements: usize, vertices_per_element: usize) -> bool {
        let floats_per_element = vertices_per_element * self.floats_per_vertex;
        let required = elements.saturating_mul(floats_per_element);
        if required <= self.data.len() {
            return false;
        }
        let grown_elements = elements.saturating_add(elements / 2);
        self.data
            .resize(grown_elements.saturating_mul(floats_per_element), 0.0);
        true
    }

    /// Forgets the previous frame's contents; keeps the storage.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn push_vertex(&mut self, x: f32, y: f32, rgba: [f32; 4]) {
        let end = self.len + 6;
        if end > self.data.len() {
            let grown = end.max(self.data.len() + self.data.len() / 2);
            self.data.resize(grown, 0.0);
        }
        self.data[self.len..end].copy_from_slice(&[x, y, rgba[0], rgba[1], rgba[2], rgba[3]]);
        self.len = end;
    }

    #[inline]
    pub fn push_position(&mut self, x: f32, y: f32) {
        let end = self.len + 2;
        if end > self.data.len() {
            let grown = end.max(self.data.len() + self.data.len() / 2);
            self.data.resize(grown, 0.0);
        }
        self.data[self.len] = x;
        self.data[self.len + 1] = y;
        self.len = end;
    }

    /// Floats written since the last reset.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data[..self.len]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.len / self.floats_per_vertex
    }

    /// Allocated floats.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Releases the storage.
    pub fn clear_storage(&mut self) {
        self.data = Vec::new();
        self.len = 0;
    }
}
