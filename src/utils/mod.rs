pub mod external_prog;
pub mod results_uploader;
