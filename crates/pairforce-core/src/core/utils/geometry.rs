use nalgebra::{Point3, Vector3};

/// Separation between two particles: `delta = x_i - x_j` and its length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaR {
    pub delta: Vector3<f64>,
    pub r2: f64,
    pub r: f64,
}

impl DeltaR {
    #[inline]
    fn from_delta(delta: Vector3<f64>) -> Self {
        let r2 = delta.norm_squared();
        Self {
            delta,
            r2,
            r: r2.sqrt(),
        }
    }
}

#[inline]
pub fn delta_r(pos_i: &Point3<f64>, pos_j: &Point3<f64>) -> DeltaR {
    DeltaR::from_delta(pos_i - pos_j)
}

/// Minimum-image separation in an orthorhombic periodic box.
#[inline]
pub fn delta_r_periodic(pos_i: &Point3<f64>, pos_j: &Point3<f64>, box_size: &Vector3<f64>) -> DeltaR {
    let raw = pos_i - pos_j;
    let wrapped = raw.zip_map(box_size, |d, l| d - (d / l + 0.5).floor() * l);
    DeltaR::from_delta(wrapped)
}

#[inline]
pub fn separation(pos_i: &Point3<f64>, pos_j: &Point3<f64>, box_size: Option<&Vector3<f64>>) -> DeltaR {
    match box_size {
        Some(box_size) => delta_r_periodic(pos_i, pos_j, box_size),
        None => delta_r(pos_i, pos_j),
    }
}
