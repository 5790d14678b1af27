pub mod number;

pub use number::{
    format_float, format_float_default, format_int, parse_bool, parse_float, parse_int,
    ExponentFormat, FloatFormat, IntFormat, Radix, Underscore,
};
