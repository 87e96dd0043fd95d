use std::fs;

const CONFIG_PATH: &str = "src/default_config.toml";
const SECTIONS: [&str; 3] = ["parse", "styles", "math"];

fn main() {
    println!("cargo:rerun-if-changed={}", CONFIG_PATH);

    let content = fs::read_to_string(CONFIG_PATH).expect("Failed to read default_config.toml");
    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid default_config.toml: {}", e),
    };

    // Section layout and colour syntax only; field types are checked by
    // `Config::compiled_default` and its test.
    for (name, value) in &table {
        if !SECTIONS.contains(&name.as_str()) {
            panic!("default_config.toml: unknown section [{}]", name);
        }
        if !value.is_table() {
            panic!("default_config.toml: [{}] must be a table", name);
        }
    }

    if let Some(styles) = table.get("styles").and_then(toml::Value::as_table) {
        for (kind, delta) in styles {
            let Some(delta) = delta.as_table() else {
                continue;
            };
            for key in ["foreground", "background"] {
                if let Some(color) = delta.get(key) {
                    check_color(kind, key, color);
                }
            }
        }
    }
}

fn check_color(kind: &str, key: &str, value: &toml::Value) {
    let valid = value
        .as_str()
        .and_then(|s| s.strip_prefix('#'))
        .is_some_and(|hex| {
            matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        });
    if !valid {
        panic!("default_config.toml: [styles.{}] {} is not a #rgb or #rrggbb color", kind, key);
    }
}
