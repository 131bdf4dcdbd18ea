//! Product swap example - replaces an object in a poster with your product.
//!
//! Run with: `cargo run --example swap -- <poster> <product> <target>`
//!
//! Requires `API_KEY` (or `GOOGLE_API_KEY`) environment variable.

use productswap::{acquire, render, Controller, Download, GeminiEditor, SelectedFile, View};
use std::sync::Arc;

#[tokio::main]
async fn main() -> productswap::Result<()> {
    let mut args = std::env::args().skip(1);
    let usage = "Usage: swap <poster> <product> <target>";
    let poster = args.next().expect(usage);
    let product = args.next().expect(usage);
    let target = args.next().expect(usage);

    let controller = Controller::new(Arc::new(GeminiEditor::builder().build()?));
    controller.set_poster(acquire(&SelectedFile::from_path(&poster)).await?);
    controller.set_product(acquire(&SelectedFile::from_path(&product)).await?);
    controller.set_target_label(target);

    if let Err(rejected) = controller.generate().await {
        eprintln!("{rejected}");
        return Ok(());
    }

    match render(&controller.snapshot()) {
        View::Comparison { edited, .. } => {
            let download = Download::of(&edited)?;
            let path = download.save_in(".")?;
            println!(
                "Edited image saved to {} ({} bytes)",
                path.display(),
                download.bytes.len()
            );
        }
        View::Error(message) => eprintln!("{message}"),
        other => eprintln!("unexpected result state: {other:?}"),
    }

    Ok(())
}
