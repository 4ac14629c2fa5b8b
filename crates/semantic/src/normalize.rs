/// Scale `v` to unit length in place. Zero vectors are left alone.
pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        v.iter_mut().for_each(|x| *x *= inv_norm);
    }
}
