use quill_core::ToolRegistry;
use quill_tools::PluginHost;

use super::ToolAction;

pub(super) fn cmd_tool(action: ToolAction) -> quill_core::Result<()> {
    let host = PluginHost::with_builtins();

    match action {
        ToolAction::List { search } => {
            let tools = match search {
                Some(ref query) => host.search_tools(query),
                None => host.tools(),
            };

            for (manifest, enabled) in host.plugins() {
                let provided: Vec<_> = tools.iter().filter(|t| t.plugin == manifest.id).collect();
                if provided.is_empty() {
                    continue;
                }
                let state = if enabled { "" } else { " \x1b[2m(disabled)\x1b[0m" };
                println!(
                    "\x1b[1m{}\x1b[0m v{} ({}){state}",
                    manifest.name, manifest.version, manifest.id
                );
                for tool in provided {
                    println!("  \x1b[36m{}\x1b[0m {}", tool.name, tool.description);
                }
                println!();
            }

            if tools.is_empty() {
                println!("No tools found.");
            }
        }
    }
    Ok(())
}
