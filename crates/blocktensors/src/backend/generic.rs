//! Generic (loop-based) backend implementation.

use crate::backend::PermutationBackend;
use crate::scalar::Scalar;
use crate::strides::compute_strides;

/// Generic backend using plain loops.
pub struct GenericBackend;

impl PermutationBackend for GenericBackend {
    fn permute_into<ElT: Scalar>(dest: &mut [ElT], src: &[ElT], src_shape: &[usize], perm: &[usize]) {
        assert_eq!(dest.len(), src.len(), "permutation must preserve length");
        if src.is_empty() {
            return;
        }

        let new_shape: Vec<usize> = perm.iter().map(|&p| src_shape[p]).collect();
        let new_strides = compute_strides(&new_shape);
        // Stride in dest of each source axis.
        let mut dest_stride_of_src = vec![0usize; src_shape.len()];
        for (i, &p) in perm.iter().enumerate() {
            dest_stride_of_src[p] = new_strides[i];
        }

        // Odometer over source indices, first axis fastest.
        let mut index = vec![0usize; src_shape.len()];
        let mut linear_new = 0usize;
        for &value in src {
            dest[linear_new] = value;
            for axis in 0..src_shape.len() {
                index[axis] += 1;
                linear_new += dest_stride_of_src[axis];
                if index[axis] < src_shape[axis] {
                    break;
                }
                linear_new -= dest_stride_of_src[axis] * src_shape[axis];
                index[axis] = 0;
            }
        }
    }
}
