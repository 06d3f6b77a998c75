use crate::*;
use ndarray::*;

/// A weighted point set: one row per point holding the weight followed by the feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    data: Array2<f32>,
}

impl Signature {
    /// Build a signature from per point weights and feature vectors.
    ///
    /// # Parameters
    ///
    /// * `weights`: One weight per point.
    /// * `features`: One feature vector per point, all of the same length.
    pub fn build(weights: &[f32], features: &[Vec<f32>]) -> Result<Signature> {
        let dimension = features.first().map_or(0, |feature| feature.len());
        if let Some(feature) = features.iter().find(|feature| feature.len() != dimension) {
            return Err(Error::DimensionMismatch {
                context: "signature feature vector",
                expected: dimension,
                got: feature.len(),
            });
        }

        let flat = features.iter().flatten().copied().collect::<Vec<_>>();
        let features = Array2::from_shape_vec((features.len(), dimension), flat)?;
        Self::from_array(ArrayView1::from(weights), features.view())
    }

    /// Build a signature from a weight vector and an NxM feature matrix.
    pub fn from_array<'a>(
        weights: ArrayView1<'a, f32>,
        features: ArrayView2<'a, f32>,
    ) -> Result<Signature> {
        if weights.len() != features.nrows() {
            return Err(Error::DimensionMismatch {
                context: "signature weights",
                expected: features.nrows(),
                got: weights.len(),
            });
        }
        if weights.iter().any(|weight| !weight.is_finite()) {
            return Err(Error::InvalidArgument(
                "signature weights must be finite".to_string(),
            ));
        }
        if features.iter().any(|value| !value.is_finite()) {
            return Err(Error::InvalidArgument(
                "signature features must be finite".to_string(),
            ));
        }

        let data = concatenate(Axis(1), &[weights.insert_axis(Axis(1)), features])?;
        Ok(Signature { data })
    }

    /// Returns the number of points
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Returns true if the signature holds no points
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Returns the feature vector dimensionality
    pub fn dimension(&self) -> usize {
        self.data.ncols() - 1
    }

    /// Returns the weight column
    pub fn weights(&self) -> ArrayView1<f32> {
        self.data.column(0)
    }

    /// Returns the feature matrix, one row per point
    pub fn features(&self) -> ArrayView2<f32> {
        self.data.slice(s![.., 1..])
    }

    /// Returns the weight of point `index`
    pub fn weight(&self, index: usize) -> f32 {
        self.data[[index, 0]]
    }

    /// Returns the feature vector of point `index`
    pub fn feature(&self, index: usize) -> ArrayView1<f32> {
        self.data.slice(s![index, 1..])
    }

    /// Returns the sum of all weights
    pub fn total_weight(&self) -> f32 {
        self.weights().sum()
    }

    /// Returns the raw `(weight, features...)` rows
    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use anyhow::Result;
    use ndarray::*;

    #[test]
    fn build() -> Result<()> {
        let signature = Signature::build(&[0.5, 1.5], &[vec![1.0, 2.0], vec![3.0, 4.0]])?;

        assert_eq!(signature.len(), 2);
        assert_eq!(signature.dimension(), 2);
        assert_eq!(
            signature.as_array(),
            &array![[0.5f32, 1.0, 2.0], [1.5, 3.0, 4.0]]
        );
        assert_eq!(signature.weights(), array![0.5f32, 1.5]);
        assert_eq!(signature.feature(1), array![3.0f32, 4.0]);
        assert_eq!(signature.total_weight(), 2.0);
        Ok(())
    }

    #[test]
    fn build_empty() -> Result<()> {
        let signature = Signature::build(&[], &[])?;
        assert!(signature.is_empty());
        assert_eq!(signature.dimension(), 0);
        Ok(())
    }

    #[test]
    fn build_count_mismatch() {
        let result = Signature::build(&[1.0], &[vec![1.0], vec![2.0]]);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                got: 1,
                ..
            })
        ));
    }

    #[test]
    fn build_ragged_features() {
        let result = Signature::build(&[1.0, 1.0], &[vec![1.0, 2.0], vec![2.0]]);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                got: 1,
                ..
            })
        ));
    }

    #[test]
    fn build_non_finite() {
        assert!(matches!(
            Signature::build(&[f32::NAN], &[vec![1.0]]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Signature::build(&[1.0], &[vec![f32::INFINITY]]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn from_array() -> Result<()> {
        let signature = Signature::from_array(
            array![1.0f32, 2.0, 3.0].view(),
            Array::range(0.0, 6.0, 1.0).into_shape((3, 2))?.view(),
        )?;
        assert_eq!(signature.features(), array![[0.0f32, 1.0], [2.0, 3.0], [4.0, 5.0]]);
        assert_eq!(signature.weight(2), 3.0);
        Ok(())
    }

    #[test]
    fn from_array_separate_owners() -> Result<()> {
        let features = array![[1.0f32, 2.0], [3.0, 4.0]];
        let signature = {
            let weights = vec![0.25f32, 0.75];
            Signature::from_array(ArrayView1::from(&weights), features.view())?
        };
        assert_eq!(signature.as_array(), &array![[0.25f32, 1.0, 2.0], [0.75, 3.0, 4.0]]);
        assert_eq!(signature.total_weight(), 1.0);
        Ok(())
    }
}
