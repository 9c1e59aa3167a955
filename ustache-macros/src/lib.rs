use proc_macro::TokenStream;

mod assets;

/// Embeds every file matching a glob (relative to the invoking crate's
/// manifest directory) and registers it as a named template at startup.
///
/// ```ignore
/// ustache::template_assets!("templates/**/*.mustache");
/// ```
#[proc_macro]
pub fn template_assets(input: TokenStream) -> TokenStream {
    assets::template_assets_impl(input)
}
