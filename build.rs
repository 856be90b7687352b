#[cfg(target_os = "windows")]
fn main() {
    use winresource::WindowsResource;

    // The icon is optional: a missing res/rclockin.ico only skips the embedding.
    if !std::path::Path::new("res/rclockin.ico").exists() {
        return;
    }

    let mut res = WindowsResource::new();
    res.set_icon("res/rclockin.ico")
        .set("FileDescription", "rClockin CLI")
        .set("ProductName", "rClockin")
        .set("OriginalFilename", "rclockin.exe")
        .set("FileVersion", env!("CARGO_PKG_VERSION"))
        .set("ProductVersion", env!("CARGO_PKG_VERSION"))
        .compile()
        .expect("Failed to embed icon resource");
}

#[cfg(not(target_os = "windows"))]
fn main() {}
