// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
 _          _          _                 _ _     _       _   _
| |__  __ _| |__   ___| |   __   ____ _| (_) __| | __ _| |_(_) ___  _ __
| '_ \/ _` | '_ \ / _ \ |   \ \ / / _` | | |/ _` |/ _` | __| |/ _ \| '_ \
| |_) | (_| | |_) |  __/ |    \ V / (_| | | | (_| | (_| | |_| | (_) | | | |
|_.__/\__,_|_.__/ \___|_|     \_/ \__,_|_|_|\__,_|\__,_|\__|_|\___/|_| |_|

    NodeNorm & NameRes Validation
"#;
    println!("{}", banner);
}
