/// Embedded agent registry that is compiled into the binary
/// Always available even if no `--agents-file` is given
pub fn get_embedded_registry() -> &'static str {
    include_str!("../../../agents/registry.json")
}
