extern crate blas_src;
extern crate blas_sys;

macro_rules! impl_blas1 {
    ($float:ident =>
        dot: $dot:ident = $dot_sys:path,
        nrm2: $nrm2:ident = $nrm2_sys:path,
    ) => {
        pub unsafe fn $dot(n: i32, x: *const $float, y: *const $float) -> $float {
            $dot_sys(&n, x, &1, y, &1)
        }

        pub unsafe fn $nrm2(n: i32, x: *const $float) -> $float {
            $nrm2_sys(&n, x, &1)
        }
    };
}

impl_blas1!(f32 =>
    dot: sdot = blas_sys::sdot_,
    nrm2: snrm2 = blas_sys::snrm2_,
);
impl_blas1!(f64 =>
    dot: ddot = blas_sys::ddot_,
    nrm2: dnrm2 = blas_sys::dnrm2_,
);
