//! Sequential batch processing.
//!
//! Jobs run strictly one at a time in queue order; the only suspension point
//! is the await on the conversion client, so at most one request is in
//! flight and log lines come out in a deterministic order. A failed job
//! never stops the batch.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    convert::{ConversionClient, ConvertResponse, request},
    error::{ConvertError, SessionError},
    session::Session,
    stats::format_count,
};

/// Receives progress from the processor.
#[async_trait]
pub trait BatchObserver: Send {
    /// The session changed (job transition or new log lines).
    async fn changed(&mut self, session: &Session);

    /// A succeeded job's output should be opened. `url` is as returned by the service.
    async fn open_download(&mut self, url: &str);
}

/// Counts for one `run_batch` / `run_one` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Short display names for inputs in precondition messages.
fn input_label(input: &str) -> &'static str {
    match input {
        "detail_file" => "明细表",
        "week_num" => "周数",
        _ => "模板",
    }
}

/// Process every job that has not succeeded yet, in queue order.
///
/// An empty queue is a no-op. If the mode lacks a required shared input the
/// batch does not start: one log line, no state change.
pub async fn run_batch<C, O>(session: &mut Session, client: &C, observer: &mut O) -> BatchReport
where
    C: ConversionClient + ?Sized,
    O: BatchObserver + ?Sized,
{
    let mut report = BatchReport::default();
    if session.queue().is_empty() {
        tracing::info!("run_batch: queue empty");
        return report;
    }

    let mode = session.mode();
    if let Some(input) = session.inputs().missing_required(mode) {
        tracing::warn!("run_batch refused: {mode} without {input}");
        session
            .log_mut()
            .push(format!("{} 模式需要先选择{}", mode, input_label(input)));
        observer.changed(session).await;
        return report;
    }

    let ids = session.queue().runnable_ids();
    tracing::info!("batch start: {} job(s), mode {mode}", ids.len());
    session.queue_mut().lock();
    for id in ids {
        match process_job(session, client, observer, id).await {
            Ok(true) => report.succeeded += 1,
            Ok(false) => report.failed += 1,
            Err(e) => tracing::error!("job {id} skipped: {e}"),
        }
    }
    session.queue_mut().unlock();
    session.log_mut().push("所有任务处理完成");
    tracing::info!(
        "batch done: {} succeeded, {} failed",
        report.succeeded,
        report.failed
    );
    observer.changed(session).await;
    report
}

/// Re-run a single pending or failed job on explicit request.
pub async fn run_one<C, O>(
    session: &mut Session,
    client: &C,
    observer: &mut O,
    id: Uuid,
) -> Result<BatchReport, SessionError>
where
    C: ConversionClient + ?Sized,
    O: BatchObserver + ?Sized,
{
    if session.is_busy() {
        return Err(SessionError::Busy);
    }
    let job = session.queue().get(id).ok_or(SessionError::UnknownJob)?;
    if job.result().is_some() {
        return Err(SessionError::NotRetryable);
    }

    session.queue_mut().lock();
    let outcome = process_job(session, client, observer, id).await;
    session.queue_mut().unlock();
    observer.changed(session).await;

    Ok(match outcome? {
        true => BatchReport {
            succeeded: 1,
            failed: 0,
        },
        false => BatchReport {
            succeeded: 0,
            failed: 1,
        },
    })
}

/// Drive one job from `Running` to a terminal state. Returns whether it succeeded.
async fn process_job<C, O>(
    session: &mut Session,
    client: &C,
    observer: &mut O,
    id: Uuid,
) -> Result<bool, SessionError>
where
    C: ConversionClient + ?Sized,
    O: BatchObserver + ?Sized,
{
    let mode = session.mode();
    let (name, source) = {
        let job = session.queue().get(id).ok_or(SessionError::UnknownJob)?;
        (job.filename.clone(), job.source.clone())
    };

    session.queue_mut().start(id)?;
    session.log_mut().push(format!("[{name}] 开始处理..."));
    observer.changed(session).await;

    let outcome = match request::build(mode, &source, session.inputs()) {
        Ok(req) => client.submit(&req).await.and_then(accept),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(resp) => {
            tracing::info!("job {id} ({name}) succeeded");
            log_success(session, &name, &resp);
            let open = resp
                .download_url
                .clone()
                .filter(|_| mode.policy().auto_open);
            if open.is_some() {
                session.log_mut().push(format!("[{name}] 准备下载..."));
            }
            session.queue_mut().succeed(id, resp)?;
            observer.changed(session).await;
            if let Some(url) = open {
                observer.open_download(&url).await;
            }
            Ok(true)
        }
        Err(e) => {
            let msg = e.to_string();
            tracing::warn!("job {id} ({name}) failed: {msg}");
            session.log_mut().push(format!("[{name}] 错误: {msg}"));
            session.queue_mut().fail(id, msg)?;
            observer.changed(session).await;
            Ok(false)
        }
    }
}

/// Anything but `status = "success"` is a rejection.
fn accept(resp: ConvertResponse) -> Result<ConvertResponse, ConvertError> {
    if resp.is_success() {
        Ok(resp)
    } else {
        Err(ConvertError::RemoteRejection(
            resp.message_text().unwrap_or("Convert failed").to_string(),
        ))
    }
}

fn log_success(session: &mut Session, name: &str, resp: &ConvertResponse) {
    let log = session.log_mut();
    log.push(format!("[{name}] 处理成功"));
    if let Some(msg) = resp.message_text() {
        log.push(format!("> {msg}"));
    }
    for line in resp.logs.iter().flatten() {
        log.push(format!("> {line}"));
    }
    if let Some(s) = &resp.stats
        && (s.store_count.is_some() || s.box_count.is_some() || s.sku_count.is_some())
    {
        log.push(format!(
            "[{name}] 汇总: 店铺 {}, 箱数 {}, SKU {}, PT {}, 总枚数 {}",
            format_count(s.store_count),
            format_count(s.box_count),
            format_count(s.sku_count),
            format_count(s.pt_count),
            format_count(s.total_qty),
        ));
    }
}
