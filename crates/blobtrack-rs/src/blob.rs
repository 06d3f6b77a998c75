use crate::BoundingBox;
use uuid::Uuid;

/// Blob represents a single detected region of interest in one frame.
///
/// A blob is immutable once created. Tracks keep their own clones of the blobs they observe.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// Unique blob identifier
    id: Uuid,
    /// Upright bounding rectangle in top, left, width, height format.
    bbox: BoundingBox,
}

impl Blob {
    /// Returns a new Blob
    ///
    /// # Parameters
    ///
    /// * `id`: An optional identifier. A random one is generated when `None`.
    /// * `bbox`: The upright bounding rectangle of the blob.
    pub fn new(id: Option<Uuid>, bbox: BoundingBox) -> Blob {
        Blob {
            id: id.unwrap_or_else(Uuid::new_v4),
            bbox,
        }
    }

    /// Returns a new Blob with a random identifier from its `(x, y, width, height)` rectangle.
    pub fn from_tlwh(x: f32, y: f32, width: f32, height: f32) -> Blob {
        Blob::new(None, BoundingBox::new(x, y, width, height))
    }

    /// Returns the unique id of the blob
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// Returns the upright bounding rectangle of the blob
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Returns the centre of the blob
    pub fn centroid(&self) -> (f32, f32) {
        self.bbox.centroid()
    }
}

/// A source of blobs, e.g. a connected component labeller run over a foreground mask.
///
/// Implementations are free to choose the image representation. Only the resulting ordered blob
/// list is consumed.
pub trait BlobDetector {
    /// The foreground mask representation the detector works on.
    type Image;

    /// Detect the blobs of `mask`.
    ///
    /// # Parameters
    ///
    /// * `mask`: The foreground mask image.
    /// * `close_holes`: How aggressively holes inside a blob are closed before labelling.
    fn detect(&self, mask: &Self::Image, close_holes: usize) -> anyhow::Result<Vec<Blob>>;
}

#[cfg(test)]
mod tests {
    use crate::*;
    use uuid::Uuid;

    #[test]
    fn new() {
        let id = Uuid::parse_str("47cd553d-d12f-4d2e-904b-0004d631fd6d").unwrap();
        let blob = Blob::new(Some(id), BoundingBox::new(0.0, 0.0, 10.0, 4.0));
        assert_eq!(blob.id(), &id);
        assert_eq!(blob.centroid(), (5.0, 2.0));
    }

    #[test]
    fn unique_ids() {
        let a = Blob::from_tlwh(0.0, 0.0, 1.0, 1.0);
        let b = Blob::from_tlwh(0.0, 0.0, 1.0, 1.0);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.bbox(), b.bbox());
    }
}
