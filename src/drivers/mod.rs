pub mod melody;
