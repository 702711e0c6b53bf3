pub mod garment_helper;
