pub mod constants;
pub mod crt_errors;
pub mod crt_hit;
pub mod geometry;
pub mod match_params;
pub mod t0_matching;
pub mod track_builder;
pub mod track_matching;
pub mod trajectory;
