use num::complex::Complex;

pub type C<T> = Complex<T>;

pub const fn c(re: f64, im: f64) -> C<f64> {
    Complex::new(re, im)
}

pub const fn cr(re: f64) -> C<f64> {
    c(re, 0.0)
}

pub const fn ci(im: f64) -> C<f64> {
    c(0.0, im)
}

pub const ZERO: C<f64> = cr(0.0);
