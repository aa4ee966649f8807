pub mod viewmode;
