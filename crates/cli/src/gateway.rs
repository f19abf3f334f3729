//! Gateway loop: JSON-lines frames in, outbound sends and notifications out.

use std::{path::Path, sync::Arc};

use {
    anyhow::Context,
    helpline_auto_reply::Pipeline,
    helpline_channels::{JsonLinesOutbound, OutboundFrame},
    helpline_common::types::GatewayFrame,
    helpline_config::HelplineConfig,
    helpline_media::FileMediaStore,
    helpline_tickets::Notifier,
    tokio::{
        io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdout},
        sync::broadcast::error::RecvError,
    },
    tracing::{debug, info, warn},
};

use crate::db_commands::open_store;

type Output = JsonLinesOutbound<Stdout>;

pub async fn run(config: &HelplineConfig, input: Option<&Path>) -> anyhow::Result<()> {
    #[cfg(feature = "metrics")]
    let _metrics = init_metrics(config)?;

    let data_dir = helpline_config::data_dir();
    let store = Arc::new(open_store(config).await?);
    let media = Arc::new(FileMediaStore::new(config.media.resolved_dir(&data_dir)));
    let outbound = Arc::new(JsonLinesOutbound::new(tokio::io::stdout()));
    let notifier = Notifier::default();

    let forwarder = tokio::spawn(forward_notifications(
        notifier.clone(),
        Arc::clone(&outbound),
    ));

    let pipeline = Pipeline::new(
        store,
        Arc::<Output>::clone(&outbound),
        media,
        notifier,
        config,
    );

    let reader: Box<dyn AsyncBufRead + Send + Unpin> = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        },
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    info!(input = ?input, "gateway started");
    let interrupted = tokio::select! {
        result = process_lines(&pipeline, reader) => {
            result?;
            false
        },
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        info!("interrupted, dropping pending replies");
        pipeline.debouncer().cancel_all();
    } else {
        info!(
            pending = pipeline.debouncer().pending_count(),
            "input closed, waiting for pending replies"
        );
        pipeline.debouncer().drain().await;
    }

    forwarder.abort();
    info!("gateway stopped");
    Ok(())
}

/// Frames are handled one at a time, in arrival order.
async fn process_lines(
    pipeline: &Pipeline,
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
) -> anyhow::Result<()> {
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let Some(frame) = parse_frame(&line, line_no) else {
            continue;
        };
        pipeline.handle_frame(frame).await;
    }
    debug!(lines = line_no, "end of input");
    Ok(())
}

/// A frame, or `None` for blank and unreadable lines.
fn parse_frame(line: &str, line_no: usize) -> Option<GatewayFrame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(line = line_no, error = %e, "skipping unreadable gateway frame");
            None
        },
    }
}

async fn forward_notifications(notifier: Notifier, outbound: Arc<Output>) {
    let mut rx = notifier.subscribe();
    loop {
        match rx.recv().await {
            Ok(notification) => {
                let payload = match serde_json::to_value(&notification) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "notification not serializable");
                        continue;
                    },
                };
                if let Err(e) = outbound
                    .write_frame(&OutboundFrame::Notification { payload })
                    .await
                {
                    warn!(error = %e, "failed to write notification");
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "notification subscriber lagged");
            },
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(feature = "metrics")]
fn init_metrics(config: &HelplineConfig) -> anyhow::Result<helpline_metrics::MetricsHandle> {
    let listen = config
        .metrics
        .listen
        .as_deref()
        .map(str::parse::<std::net::SocketAddr>)
        .transpose()
        .context("metrics.listen is not a socket address")?;
    helpline_metrics::init_metrics(helpline_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen,
        global_labels: vec![("service".into(), "helpline".into())],
    })
}
