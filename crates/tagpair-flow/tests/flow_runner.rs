//! The async runner drives a full flow from commands and reader events.

use std::time::Duration;

use tagpair_core::PairingTable;
use tagpair_flow::{FlowConfig, FlowRunner, FlowState, Peripherals, SessionFlowController};
use tagpair_hardware::Symbology;
use tagpair_hardware::mock::{MockBarcodeReader, MockNfcReader, MockRedirect};
use tagpair_storage::MemoryStore;
use tokio::sync::mpsc;

#[tokio::test(start_paused = true)]
async fn test_runner_completes_and_restarts_flow() {
    let (tx, events) = mpsc::channel(16);
    let (barcode_reader, barcode) = MockBarcodeReader::new(tx.clone());
    let (nfc_reader, nfc) = MockNfcReader::new(tx);
    let (redirect, _) = MockRedirect::new();

    let controller = SessionFlowController::new(
        FlowConfig::new().reset_delay(Duration::from_secs(5)),
        PairingTable::demo(),
        MemoryStore::new(),
        Peripherals::new(barcode_reader, nfc_reader, redirect),
    )
    .await
    .unwrap();

    let handle = FlowRunner::spawn(controller, events);
    let mut status = handle.subscribe();
    assert_eq!(handle.status().state, FlowState::Idle);

    handle.start().await.unwrap();
    status
        .wait_for(|s| s.state == FlowState::ScanningBarcode)
        .await
        .unwrap();
    let first_session = handle.status().session_id;

    barcode
        .scan("8901435003005", Symbology::Ean13)
        .await
        .unwrap();
    status
        .wait_for(|s| s.state == FlowState::ScanningNfc)
        .await
        .unwrap();

    nfc.present_tag("5f:af:2e:cb:9e:58:1b").await.unwrap();
    status
        .wait_for(|s| s.state == FlowState::Success)
        .await
        .unwrap();
    assert_eq!(
        handle.status().message.as_deref(),
        Some("Validation successful!")
    );

    // The paused clock auto-advances to the restart deadline.
    status
        .wait_for(|s| s.state == FlowState::ScanningBarcode && s.session_id != first_session)
        .await
        .unwrap();
    assert!(barcode.is_active());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_runner_cancel_keeps_state() {
    let (tx, events) = mpsc::channel(16);
    let (barcode_reader, barcode) = MockBarcodeReader::new(tx.clone());
    let (nfc_reader, nfc) = MockNfcReader::new(tx);
    let (redirect, _) = MockRedirect::new();

    let controller = SessionFlowController::new(
        FlowConfig::default(),
        PairingTable::demo(),
        MemoryStore::new(),
        Peripherals::new(barcode_reader, nfc_reader, redirect),
    )
    .await
    .unwrap();

    let handle = FlowRunner::spawn(controller, events);
    let mut status = handle.subscribe();

    handle.start().await.unwrap();
    status
        .wait_for(|s| s.state == FlowState::ScanningBarcode)
        .await
        .unwrap();
    barcode.scan("4987176270337", Symbology::Ean13).await.unwrap();
    status
        .wait_for(|s| s.state == FlowState::ScanningNfc)
        .await
        .unwrap();

    handle.cancel().await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(nfc.is_cancelled());
    assert_eq!(handle.status().state, FlowState::ScanningNfc);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_status_readable_after_shutdown() {
    let (tx, events) = mpsc::channel(16);
    let (barcode_reader, _) = MockBarcodeReader::new(tx.clone());
    let (nfc_reader, _) = MockNfcReader::new(tx);
    let (redirect, _) = MockRedirect::new();

    let controller = SessionFlowController::new(
        FlowConfig::default(),
        PairingTable::demo(),
        MemoryStore::new(),
        Peripherals::new(barcode_reader, nfc_reader, redirect),
    )
    .await
    .unwrap();

    let handle = FlowRunner::spawn(controller, events);
    let status = handle.subscribe();
    handle.shutdown().await.unwrap();

    // The status channel stays readable after the runner exits.
    assert_eq!(status.borrow().state, FlowState::Idle);
}
