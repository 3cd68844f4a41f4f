fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-check-cfg=cfg(has_doc_auto_cfg)");

    // mark feature gated items (compression) in generated docs
    let ac = autocfg::new();
    if ac.probe_raw("#![feature(doc_auto_cfg)]").is_ok() {
        println!("cargo:rustc-cfg=has_doc_auto_cfg");
    }
}
