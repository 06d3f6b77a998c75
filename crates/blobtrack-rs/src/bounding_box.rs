use ndarray::*;

/// BoundingBox represents the axis-aligned upright rectangle around a blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Left of the bounding box (i.e. min-x)
    x: f32,
    /// Top of the bounding box (i.e. min-y in image co-ordinates)
    y: f32,
    /// Width of the bounding box
    width: f32,
    /// Height of the bounding box
    height: f32,
}

impl BoundingBox {
    /// Returns a new BoundingBox
    ///
    /// # Parameters
    ///
    /// * `x`: Bounding box left.
    /// * `y`: Bounding box top.
    /// * `width`: Bounding box width.
    /// * `height`: Bounding box height.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the x of the top left corner
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Returns the y of the top left corner
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Returns the width of the bounding box
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Returns the height of the bounding box
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Returns the area of the bounding box
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Returns the centre of the bounding box as `(x, y)`.
    pub fn centroid(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns a copy of the bounding box with the top left corner moved by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> BoundingBox {
        BoundingBox::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Returns the bounding box in left, top, width, height format, i.e., `(min x, min y, width, height)`.
    pub fn to_tlwh(&self) -> Array1<f32> {
        arr1::<f32>(&[self.x, self.y, self.width, self.height])
    }

    /// Returns the bounding box in top-left, bottom-right format, i.e., `(min x, min y, max x, max y)`.
    pub fn to_tlbr(&self) -> Array1<f32> {
        arr1::<f32>(&[self.x, self.y, self.x + self.width, self.y + self.height])
    }
}
