// print-agent/tests/job_loop.rs
// 集成测试 - job loop against an in-memory ticket queue and printer

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use label_printer::canvas::{BLACK, WHITE};
use label_printer::{PrintError, PrintResult, Printer, RasterOptions, TextExtent, Typeface};
use print_agent::label::LEFT_MARGIN;
use print_agent::{
    AckPolicy, ComposeError, CycleOutcome, JobError, JobLoop, LabelComposer, LoopSettings,
    PrinterSink,
};
use qrcode::{Color, EcLevel, QrCode};
use shared::{LabelField, LabelSpec, Ticket};
use ticket_client::{ClientError, ClientResult, TicketSource};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fakes
// ============================================================================

/// Square glyphs drawn as solid blocks
struct BlockFace;

impl Typeface for BlockFace {
    fn measure(&self, text: &str, size: u32) -> TextExtent {
        if text.is_empty() {
            return TextExtent::default();
        }
        TextExtent {
            width: text.chars().count() as u32 * size,
            height: size,
        }
    }

    fn draw(&self, canvas: &mut RgbImage, text: &str, x: u32, y: u32, size: u32, color: Rgb<u8>) {
        let extent = self.measure(text, size);
        for py in y..(y + extent.height).min(canvas.height()) {
            for px in x..(x + extent.width).min(canvas.width()) {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

type AckReply = ClientResult<bool>;

/// Ticket service: a ticket stays queued until an acknowledgment is accepted
#[derive(Default)]
struct FakeSource {
    queue: Mutex<Vec<Ticket>>,
    fail_poll: bool,
    fail_resolve: bool,
    /// Scripted acknowledgment replies; `Ok(true)` once exhausted
    ack_replies: Mutex<VecDeque<AckReply>>,
    polls: AtomicUsize,
    resolves: AtomicUsize,
    ack_calls: AtomicUsize,
    acked: Mutex<Vec<i64>>,
}

impl FakeSource {
    fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            queue: Mutex::new(tickets),
            ..Self::default()
        }
    }

    fn script_acks(self, replies: Vec<AckReply>) -> Self {
        *self.ack_replies.lock().unwrap() = replies.into();
        self
    }

    fn queued(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    fn acked(&self) -> Vec<i64> {
        self.acked.lock().unwrap().clone()
    }
}

fn unavailable(path: &str) -> ClientError {
    ClientError::Status {
        path: path.to_string(),
        status: 503,
        body: "maintenance".to_string(),
    }
}

#[async_trait]
impl TicketSource for FakeSource {
    async fn next_printable(&self) -> ClientResult<Option<Ticket>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.fail_poll {
            return Err(unavailable("ticketstoprint/"));
        }
        Ok(self.queue.lock().unwrap().first().cloned())
    }

    async fn resolve(&self, ticket: &Ticket) -> ClientResult<LabelSpec> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if self.fail_resolve {
            return Err(unavailable(&format!("ticketinfo/{}/", ticket.ticket_info)));
        }
        Ok(LabelSpec {
            camp_name: "Camp Alpha".to_string(),
            clan_name: "Wolves".to_string(),
            fee_name: "Adult".to_string(),
            ticket_guid: ticket.guid.clone(),
        })
    }

    async fn acknowledge(&self, ticket: &Ticket) -> ClientResult<bool> {
        self.ack_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.ack_replies.lock().unwrap().pop_front().unwrap_or(Ok(true));
        if let Ok(true) = reply {
            self.acked.lock().unwrap().push(ticket.pk);
            self.queue.lock().unwrap().retain(|t| t.pk != ticket.pk);
        }
        reply
    }
}

/// Printer recording every job it accepts
#[derive(Default)]
struct FakePrinter {
    failures_left: AtomicUsize,
    jobs: Mutex<Vec<Vec<u8>>>,
}

impl FakePrinter {
    fn failing(times: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    fn jobs(&self) -> Vec<Vec<u8>> {
        self.jobs.lock().unwrap().clone()
    }
}

impl Printer for FakePrinter {
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PrintError::Offline("/dev/usb/lp0: No such device".to_string()));
        }
        self.jobs.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn is_online(&self) -> bool {
        true
    }
}

// ============================================================================
// Helpers
// ============================================================================

const WIDTH: u32 = 696;
const HEIGHT: u32 = 400;

fn ticket(pk: i64, guid: &str) -> Ticket {
    Ticket {
        pk,
        guid: guid.to_string(),
        ticket_info: pk * 10,
        printed: false,
    }
}

fn settings() -> LoopSettings {
    LoopSettings::new(WIDTH, HEIGHT)
}

fn job_loop(
    source: FakeSource,
    printer: FakePrinter,
    settings: LoopSettings,
) -> JobLoop<FakeSource, BlockFace, FakePrinter> {
    let sink = PrinterSink::new(printer, "QL-570", "62", RasterOptions::default()).unwrap();
    JobLoop::new(source, LabelComposer::new(BlockFace), sink, settings)
}

fn printed_jobs(agent: &JobLoop<FakeSource, BlockFace, FakePrinter>) -> Vec<Vec<u8>> {
    agent.sink().printer().jobs()
}

/// Compare the symbol pasted at (`LEFT_MARGIN`, `HEIGHT / 2`) with a fresh
/// encoding of `data`, module by module, as far as it is on the canvas
fn assert_code_encodes(img: &RgbImage, data: &str) {
    let reference = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M).unwrap();
    let modules = reference.width() as u32;
    let mut checked = 0;

    for (i, color) in reference.to_colors().into_iter().enumerate() {
        let x = LEFT_MARGIN + 40 + (i as u32 % modules) * 10 + 5;
        let y = HEIGHT / 2 + 40 + (i as u32 / modules) * 10 + 5;
        if x >= img.width() || y >= img.height() {
            continue;
        }
        let expected = if color == Color::Dark { BLACK } else { WHITE };
        assert_eq!(*img.get_pixel(x, y), expected, "module at ({x}, {y})");
        checked += 1;
    }
    assert!(checked > 0);
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_single_ticket_printed_and_acknowledged() {
    let agent = job_loop(
        FakeSource::with_tickets(vec![ticket(1, "ABC123")]),
        FakePrinter::default(),
        settings(),
    );

    let outcome = agent.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Printed { pk: 1 });
    assert_eq!(agent.source().acked(), vec![1]);
    assert_eq!(agent.source().queued(), 0);

    // The printer received exactly the raster stream of the composed label
    let spec = LabelSpec {
        camp_name: "Camp Alpha".to_string(),
        clan_name: "Wolves".to_string(),
        fee_name: "Adult".to_string(),
        ticket_guid: "ABC123".to_string(),
    };
    let label = LabelComposer::new(BlockFace)
        .compose(&spec, WIDTH, HEIGHT)
        .unwrap();
    assert_eq!(label.regions().len(), 4);
    assert!(label.region(LabelField::Guid).unwrap().height > 0);
    assert_code_encodes(label.image(), "ABC123");
    let expected = agent.sink().render_job(&label).unwrap();

    let jobs = printed_jobs(&agent);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0], expected.as_bytes());
    assert!(jobs[0][..200].iter().all(|&b| b == 0));
    assert_eq!(jobs[0].last(), Some(&0x1A));
}

#[tokio::test]
async fn test_empty_queue_does_nothing() {
    let agent = job_loop(FakeSource::default(), FakePrinter::default(), settings());

    let outcome = agent.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Idle);
    assert_eq!(agent.source().polls.load(Ordering::SeqCst), 1);
    assert_eq!(agent.source().resolves.load(Ordering::SeqCst), 0);
    assert_eq!(agent.source().ack_calls.load(Ordering::SeqCst), 0);
    assert!(printed_jobs(&agent).is_empty());
}

#[tokio::test]
async fn test_printer_failure_is_not_acknowledged() {
    let agent = job_loop(
        FakeSource::with_tickets(vec![ticket(1, "ABC123")]),
        FakePrinter::failing(1),
        settings(),
    );
    let shutdown = CancellationToken::new();

    let err = agent.run_once(&shutdown).await.unwrap_err();
    assert!(matches!(err, JobError::Device(PrintError::Offline(_))));
    assert_eq!(agent.source().ack_calls.load(Ordering::SeqCst), 0);
    assert_eq!(agent.source().queued(), 1);
    assert!(printed_jobs(&agent).is_empty());

    // Re-offered on the next poll and printed once the device is back
    let outcome = agent.run_once(&shutdown).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Printed { pk: 1 });
    assert_eq!(printed_jobs(&agent).len(), 1);
    assert_eq!(agent.source().acked(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_acknowledgment_retries_never_reprint() {
    let source = FakeSource::with_tickets(vec![ticket(7, "RETRY-7")])
        .script_acks(vec![Err(unavailable("markTicketPrinted/7/")), Ok(false)]);
    let settings = LoopSettings {
        ack: AckPolicy {
            retries: 2,
            retry_delay: Duration::from_millis(500),
        },
        ..settings()
    };
    let agent = job_loop(source, FakePrinter::default(), settings);

    let outcome = agent.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Printed { pk: 7 });
    assert_eq!(agent.source().ack_calls.load(Ordering::SeqCst), 3);
    assert_eq!(printed_jobs(&agent).len(), 1);
    assert_eq!(agent.source().acked(), vec![7]);
}

#[tokio::test]
async fn test_unacknowledged_ticket_prints_again() {
    let source = FakeSource::with_tickets(vec![ticket(3, "DUP-3")]).script_acks(vec![Ok(false)]);
    let agent = job_loop(source, FakePrinter::default(), settings());
    let shutdown = CancellationToken::new();

    let outcome = agent.run_once(&shutdown).await.unwrap();
    match outcome {
        CycleOutcome::PrintedUnacknowledged { pk, reason } => {
            assert_eq!(pk, 3);
            assert!(!reason.is_empty());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(agent.source().queued(), 1);

    let outcome = agent.run_once(&shutdown).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Printed { pk: 3 });

    let jobs = printed_jobs(&agent);
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0], jobs[1]);
}

#[tokio::test]
async fn test_resolve_failure_skips_print() {
    let source = FakeSource {
        fail_resolve: true,
        ..FakeSource::with_tickets(vec![ticket(1, "ABC123")])
    };
    let agent = job_loop(source, FakePrinter::default(), settings());

    let err = agent.run_once(&CancellationToken::new()).await.unwrap_err();

    match err {
        JobError::Source(ClientError::Status { path, status, .. }) => {
            assert_eq!(path, "ticketinfo/10/");
            assert_eq!(status, 503);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(printed_jobs(&agent).is_empty());
    assert_eq!(agent.source().ack_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_poll_failure() {
    let source = FakeSource {
        fail_poll: true,
        ..FakeSource::with_tickets(vec![ticket(1, "ABC123")])
    };
    let agent = job_loop(source, FakePrinter::default(), settings());

    let err = agent.run_once(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, JobError::Source(_)));
    assert_eq!(agent.source().resolves.load(Ordering::SeqCst), 0);
    assert!(printed_jobs(&agent).is_empty());
}

#[tokio::test]
async fn test_unrenderable_ticket_skips_print() {
    let guid = "G".repeat(5000);
    let agent = job_loop(
        FakeSource::with_tickets(vec![ticket(9, &guid)]),
        FakePrinter::default(),
        settings(),
    );

    let err = agent.run_once(&CancellationToken::new()).await.unwrap_err();

    match err {
        JobError::Render(ComposeError::Field { field, .. }) => assert_eq!(field, LabelField::Code),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(printed_jobs(&agent).is_empty());
    assert_eq!(agent.source().ack_calls.load(Ordering::SeqCst), 0);
    assert_eq!(agent.source().queued(), 1);
}

#[tokio::test]
async fn test_media_mismatch_is_a_rendering_failure() {
    let sink =
        PrinterSink::new(FakePrinter::default(), "QL-570", "62x29", RasterOptions::default())
            .unwrap();
    assert!(matches!(
        sink.check_canvas(WIDTH, HEIGHT),
        Err(PrintError::InvalidConfig(_))
    ));
    let agent = JobLoop::new(
        FakeSource::with_tickets(vec![ticket(4, "ABC123")]),
        LabelComposer::new(BlockFace),
        sink,
        settings(),
    );

    let err = agent.run_once(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, JobError::Raster(PrintError::InvalidImage(_))));
    assert!(printed_jobs(&agent).is_empty());
    assert_eq!(agent.source().ack_calls.load(Ordering::SeqCst), 0);
    assert_eq!(agent.source().queued(), 1);
}

#[tokio::test]
async fn test_shutdown_before_printing_leaves_ticket_queued() {
    let agent = job_loop(
        FakeSource::with_tickets(vec![ticket(1, "ABC123")]),
        FakePrinter::default(),
        settings(),
    );
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let outcome = agent.run_once(&shutdown).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Cancelled { pk: 1 });
    assert!(printed_jobs(&agent).is_empty());
    assert_eq!(agent.source().ack_calls.load(Ordering::SeqCst), 0);
    assert_eq!(agent.source().queued(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_polls_until_cancelled() {
    let agent = job_loop(
        FakeSource::with_tickets(vec![ticket(1, "ABC123"), ticket(2, "DEF456")]),
        FakePrinter::default(),
        settings(),
    );
    let shutdown = CancellationToken::new();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    agent.run(shutdown).await;

    // t=0 prints 1, t=2 prints 2, t=4 finds nothing, cancelled at t=5
    assert_eq!(agent.source().acked(), vec![1, 2]);
    assert_eq!(printed_jobs(&agent).len(), 2);
    assert_eq!(agent.source().polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_run_returns_immediately_when_already_cancelled() {
    let agent = job_loop(
        FakeSource::with_tickets(vec![ticket(1, "ABC123")]),
        FakePrinter::default(),
        settings(),
    );
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    agent.run(shutdown).await;

    assert_eq!(agent.source().polls.load(Ordering::SeqCst), 0);
    assert!(printed_jobs(&agent).is_empty());
}

#[tokio::test]
async fn test_label_snapshot_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticket.png");
    let settings = LoopSettings {
        snapshot: Some(path.clone()),
        ..settings()
    };
    let agent = job_loop(
        FakeSource::with_tickets(vec![ticket(1, "ABC123")]),
        FakePrinter::default(),
        settings,
    );

    agent.run_once(&CancellationToken::new()).await.unwrap();

    let snapshot = image::open(&path).unwrap().to_rgb8();
    assert_eq!(snapshot.dimensions(), (WIDTH, HEIGHT));
    assert_code_encodes(&snapshot, "ABC123");
}

#[tokio::test]
async fn test_snapshot_failure_does_not_block_printing() {
    let settings = LoopSettings {
        snapshot: Some("/nonexistent/dir/ticket.png".into()),
        ..settings()
    };
    let agent = job_loop(
        FakeSource::with_tickets(vec![ticket(1, "ABC123")]),
        FakePrinter::default(),
        settings,
    );

    let outcome = agent.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Printed { pk: 1 });
    assert_eq!(printed_jobs(&agent).len(), 1);
}
