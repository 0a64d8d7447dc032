use label_printer::{DevicePrinter, PrintError, Printer, Transport};
use tempfile::TempDir;

#[tokio::test]
async fn test_job_written_in_full() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lp0");
    std::fs::write(&path, b"").unwrap();

    let printer = DevicePrinter::new(&path);
    let job: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    printer.print(&job).await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), job);
}

#[tokio::test]
async fn test_each_job_replaces_previous() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lp0");
    std::fs::write(&path, b"").unwrap();

    let printer = DevicePrinter::new(&path);
    printer.print(b"first job, longer").await.unwrap();
    printer.print(b"second").await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"second");
}

#[tokio::test]
async fn test_missing_device_is_offline() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unplugged");

    let printer = DevicePrinter::new(&path);
    assert!(!printer.is_online().await);

    let err = printer.print(b"data").await.unwrap_err();
    assert!(matches!(err, PrintError::Offline(_)));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_transport_dispatches_to_device() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lp0");
    std::fs::write(&path, b"").unwrap();

    let transport = Transport::from_path(path.to_str().unwrap()).unwrap();
    assert!(transport.is_online().await);
    transport.print(&[0x1B, 0x40, 0x1A]).await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), vec![0x1B, 0x40, 0x1A]);
}
