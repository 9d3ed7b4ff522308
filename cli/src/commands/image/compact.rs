//! # Envkeep Image Compact Handler
//!
//! File: cli/src/commands/image/compact.rs
//!
//! ## Overview
//!
//! `envkeep image compact` shrinks the environment image:
//!
//! 1. Refuses while the container runs (stop it first).
//! 2. Keeps the source image as `backup_<timestamp>`.
//! 3. Exports a throwaway container and imports it as a single layer
//!    (`compressed`), which drops CMD/ENTRYPOINT/WORKDIR/ENV.
//! 4. Rebuilds those settings on top (`compressed_with_metadata`).
//! 5. Prints the size before and after, then asks whether the result should
//!    replace the source tag.
//!
//! Declining is a successful outcome: the result stays under
//! `compressed_with_metadata` for inspection and the source tag is untouched.
//!
//! ```bash
//! envkeep env stop
//! envkeep image compact
//! envkeep image compact --tag gpu --yes
//! ```
//!
use crate::common::ui::{prompts, tables};
use crate::core::error::Result;
use crate::manager::{
    compactor::{CompactedImage, ImageCompactor},
    context::Session,
};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Flatten the environment image to reclaim space")]
pub struct CompactArgs {
    /// Tag of the repository to compact [default: the configured tag].
    #[arg(long, short = 't')]
    tag: Option<String>,

    /// Adopt the compacted image without asking.
    #[arg(long, short = 'y')]
    yes: bool,
}

fn render_summary(compacted: &CompactedImage) -> String {
    let mut out = format!(
        "Compacted '{}' into '{}' (original kept as '{}').\n",
        compacted.source, compacted.result, compacted.backup
    );
    match &compacted.sizes {
        Some(sizes) => out.push_str(&format!(
            "  Size: {} -> {} (saved {}, {:.1}%)\n",
            tables::human_size(sizes.before),
            tables::human_size(sizes.after),
            tables::human_size(sizes.saved()),
            sizes.saved_percent()
        )),
        None => out.push_str("  Size: unknown\n"),
    }
    out
}

pub async fn handle_compact(args: CompactArgs, session: &Session) -> Result<()> {
    info!("Handling image compact command...");
    debug!("Compact args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let compactor = ImageCompactor::new(&lifecycle);

    println!("Compacting... this exports and re-imports the whole filesystem.");
    let compacted = compactor.compact(args.tag.as_deref()).await?;
    print!("{}", render_summary(&compacted));

    let confirmed = prompts::ask(
        &format!(
            "Replace '{}' with the compacted image?",
            compacted.source
        ),
        args.yes,
    )?;
    println!("{}", conclude(&compactor, &compacted, confirmed).await?);
    Ok(())
}

/// Adopts the result when confirmed; otherwise leaves both tags as they are.
async fn conclude(
    compactor: &ImageCompactor<'_, '_>,
    compacted: &CompactedImage,
    confirmed: bool,
) -> Result<String> {
    if !confirmed {
        info!("Adoption declined; keeping '{}'", compacted.result);
        return Ok(format!(
            "Left '{}' unchanged; the compacted image stays available as '{}'.",
            compacted.source, compacted.result
        ));
    }
    compactor.adopt(compacted, true).await?;
    Ok(format!("'{}' is now the compacted image.", compacted.source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::docker::ImageDetails;
    use crate::manager::lifecycle::LifecycleController;
    use crate::manager::testing::{test_config, FakeEngine};
    use crate::manager::{compactor::SizeReport, model::{ImageRef, RuntimeMetadata}};

    #[tokio::test]
    async fn test_declining_adoption_succeeds_and_keeps_both_images() {
        let engine = FakeEngine::new();
        let original = engine.add_image_with(
            "ml-dev:latest",
            ImageDetails {
                size: 1000,
                cmd: Some(vec!["python".into()]),
                ..Default::default()
            },
        );
        let config = test_config();
        let controller = LifecycleController::new(&engine, &config);
        let compactor = ImageCompactor::new(&controller);
        let compacted = compactor.compact(None).await.unwrap();

        let message = conclude(&compactor, &compacted, false).await.unwrap();
        assert!(message.contains("ml-dev:compressed_with_metadata"));
        assert_eq!(engine.image_id("ml-dev:latest"), Some(original));
        assert!(engine.image_id("ml-dev:compressed_with_metadata").is_some());

        let message = conclude(&compactor, &compacted, true).await.unwrap();
        assert!(message.contains("is now the compacted image"));
        assert!(engine.image_id("ml-dev:compressed_with_metadata").is_none());
    }

    #[test]
    fn test_compact_args() {
        let args = CompactArgs::try_parse_from(["compact"]).unwrap();
        assert!(args.tag.is_none());
        assert!(!args.yes);
        let args = CompactArgs::try_parse_from(["compact", "--tag", "gpu", "--yes"]).unwrap();
        assert_eq!(args.tag.as_deref(), Some("gpu"));
        assert!(args.yes);
    }

    #[test]
    fn test_summary_reports_savings() {
        let compacted = CompactedImage {
            source: ImageRef::new("ml-dev", "latest"),
            backup: ImageRef::new("ml-dev", "backup_20240301_120000"),
            result: ImageRef::new("ml-dev", "compressed_with_metadata"),
            metadata: RuntimeMetadata {
                cmd: vec!["/bin/bash".into()],
                entrypoint: vec![],
                working_dir: "/".into(),
                env: vec![],
            },
            sizes: Some(SizeReport {
                before: 4 * 1024 * 1024 * 1024,
                after: 3 * 1024 * 1024 * 1024,
            }),
        };
        let text = render_summary(&compacted);
        assert!(text.contains("original kept as 'ml-dev:backup_20240301_120000'"));
        assert!(text.contains("4.00 GB -> 3.00 GB (saved 1.00 GB, 25.0%)"));
    }
}
