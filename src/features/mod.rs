pub mod prendas;
