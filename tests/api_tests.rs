//! API integration tests
//!
//! These run against a live server with the migrations applied and one
//! catalog item seeded: id 1, module Book, genre 1.
//! Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const SEEDED_ITEM: i32 = 1;

/// Register a fresh copy of the seeded item and return its id
async fn register_copy(client: &Client, barcode: &str) -> i64 {
    let response = client
        .post(format!("{}/items/{}/copies", BASE_URL, SEEDED_ITEM))
        .json(&json!({
            "structure_id": 1,
            "barcode": barcode,
            "condition": "Good"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No copy ID")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_reports_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_register_copy_assigns_sequence() {
    let client = Client::new();

    let first = register_copy(&client, "TST000000001").await;
    let second = register_copy(&client, "TST000000002").await;
    assert_ne!(first, second);

    let response = client
        .get(format!("{}/items/{}/copies", BASE_URL, SEEDED_ITEM))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let copies = body.as_array().expect("Expected array");

    // Sequences strictly increase in listing order
    let sequences: Vec<i64> = copies
        .iter()
        .map(|c| c["sequence"].as_i64().expect("No sequence"))
        .collect();
    let mut sorted = sequences.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sequences.len(), sorted.len(), "duplicate sequence numbers");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_barcode_rejected() {
    let client = Client::new();

    register_copy(&client, "TST000000DUP").await;

    let response = client
        .post(format!("{}/items/{}/copies", BASE_URL, SEEDED_ITEM))
        .json(&json!({
            "structure_id": 1,
            "barcode": "TST000000DUP"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_checkout_and_return() {
    let client = Client::new();
    let copy_id = register_copy(&client, "TST00000CIRC").await;

    // Checkout
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 100 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let loan: Value = response.json().await.expect("Failed to parse response");
    assert!(loan["due_date"].is_string());
    assert_eq!(loan["renewal_count"], 0);

    // Copy is now Borrowed; a second checkout must conflict
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 101 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Return
    let response = client
        .post(format!("{}/copies/{}/return", BASE_URL, copy_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let outcome: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(outcome["copy_status"], "Available");
    assert!(outcome["ready_reservation"].is_null());

    // Double return is rejected
    let response = client
        .post(format!("{}/copies/{}/return", BASE_URL, copy_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_checkouts_single_winner() {
    let client = Client::new();
    let copy_id = register_copy(&client, "TST0000RACE1").await;

    // Fire both checkouts at once; exactly one may win the copy
    let first = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 600 }))
        .send();
    let second = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 601 }))
        .send();

    let (first, second) = tokio::join!(first, second);
    let mut statuses = vec![
        first.expect("Failed to send request").status().as_u16(),
        second.expect("Failed to send request").status().as_u16(),
    ];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![201, 409]);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_cancel_and_pickup_resolve_cleanly() {
    let client = Client::new();
    register_copy(&client, "TST0000RACE2").await;

    // An on-shelf copy makes the reservation Ready immediately
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .json(&json!({ "item_id": SEEDED_ITEM, "user_id": 610, "structure_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let reservation: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(reservation["status"], "Ready");
    let reservation_id = reservation["id"].as_i64().expect("No reservation ID");
    let held_copy = reservation["copy_id"].as_i64().expect("No held copy");

    // Cancel and pickup of the same Ready reservation at once; the loser
    // gets a clean conflict, never a server error
    let cancel = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .send();
    let pickup = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": held_copy, "user_id": 610 }))
        .send();

    let (cancel, pickup) = tokio::join!(cancel, pickup);
    let cancel_status = cancel.expect("Failed to send request").status().as_u16();
    let pickup_status = pickup.expect("Failed to send request").status().as_u16();

    assert!(cancel_status < 500, "cancel returned {}", cancel_status);
    assert!(pickup_status < 500, "pickup returned {}", pickup_status);
    assert!(
        cancel_status == 200 || pickup_status == 201,
        "neither side completed: cancel {}, pickup {}",
        cancel_status,
        pickup_status
    );
}

#[tokio::test]
#[ignore]
async fn test_pulling_held_copy_releases_claim() {
    let client = Client::new();
    register_copy(&client, "TST0000PULLM").await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .json(&json!({ "item_id": SEEDED_ITEM, "user_id": 620, "structure_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let reservation: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(reservation["status"], "Ready");
    let reservation_id = reservation["id"].as_i64().expect("No reservation ID");
    let held_copy = reservation["copy_id"].as_i64().expect("No held copy");

    // Pull the held copy out of circulation
    let response = client
        .put(format!("{}/copies/{}/status", BASE_URL, held_copy))
        .json(&json!({ "status": "Maintenance" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // The reservation stays active but no longer points at the pulled copy:
    // rehomed onto another on-shelf copy, or back to Waiting
    let response = client
        .get(format!("{}/users/620/reservations", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let reservations: Value = response.json().await.expect("Failed to parse response");
    let ours = reservations
        .as_array()
        .expect("Expected array")
        .iter()
        .find(|r| r["id"] == reservation_id)
        .expect("reservation dropped from the active list");

    assert_ne!(ours["copy_id"], held_copy);
    match ours["status"].as_str() {
        Some("Ready") => assert!(ours["copy_id"].is_i64()),
        Some("Waiting") => assert!(ours["copy_id"].is_null()),
        other => panic!("unexpected reservation status {:?}", other),
    }

    // Clean up so later queue tests see no stray claim
    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_return_hands_copy_to_queue_head() {
    let client = Client::new();
    let copy_id = register_copy(&client, "TST0000QUEUE").await;

    // Borrow the only copy
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 200 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Queue two reservations; both wait since nothing is on the shelf
    // (assumes no other available copies of the seeded item)
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .json(&json!({ "item_id": SEEDED_ITEM, "user_id": 201, "structure_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let first: Value = response.json().await.expect("Failed to parse response");

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .json(&json!({ "item_id": SEEDED_ITEM, "user_id": 202, "structure_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Return routes the copy to the first requester
    let response = client
        .post(format!("{}/copies/{}/return", BASE_URL, copy_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let outcome: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(outcome["copy_status"], "Reserved");
    assert_eq!(outcome["ready_reservation"]["id"], first["id"]);
    assert_eq!(outcome["ready_reservation"]["user_id"], 201);

    // Pickup by a different user is refused
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 202 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // The holder picks it up
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 201 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_prolongation_lifecycle() {
    let client = Client::new();
    let copy_id = register_copy(&client, "TST0000PROLO").await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 300 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loan["id"].as_i64().expect("No loan ID");
    let original_due = loan["due_date"].as_str().expect("No due date").to_string();

    // Automatic prolongation commits immediately
    let response = client
        .post(format!("{}/prolongations", BASE_URL))
        .json(&json!({ "loan_id": loan_id, "user_id": 300, "kind": "Automatic" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let auto: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(auto["status"], "Approved");
    assert!(auto["new_due_date"].as_str().expect("No new due date") > original_due.as_str());

    // Manual prolongation queues Pending
    let response = client
        .post(format!("{}/prolongations", BASE_URL))
        .json(&json!({ "loan_id": loan_id, "user_id": 300, "kind": "Manual" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let manual: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(manual["status"], "Pending");
    let manual_id = manual["id"].as_i64().expect("No prolongation ID");

    // Approve it
    let response = client
        .post(format!("{}/prolongations/{}/approve", BASE_URL, manual_id))
        .json(&json!({ "processor_id": 1, "comment": "ok" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Approving twice conflicts
    let response = client
        .post(format!("{}/prolongations/{}/approve", BASE_URL, manual_id))
        .json(&json!({ "processor_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Ceiling: with max_renewals = 2 a third request is refused
    let response = client
        .post(format!("{}/prolongations", BASE_URL))
        .json(&json!({ "loan_id": loan_id, "user_id": 300, "kind": "Automatic" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_denied_prolongation_leaves_loan_untouched() {
    let client = Client::new();
    let copy_id = register_copy(&client, "TST0000DENYP").await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 310 }))
        .send()
        .await
        .expect("Failed to send request");
    let loan: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loan["id"].as_i64().expect("No loan ID");
    let due_before = loan["due_date"].as_str().expect("No due date").to_string();

    let response = client
        .post(format!("{}/prolongations", BASE_URL))
        .json(&json!({ "loan_id": loan_id, "user_id": 310, "kind": "Manual" }))
        .send()
        .await
        .expect("Failed to send request");
    let manual: Value = response.json().await.expect("Failed to parse response");
    let manual_id = manual["id"].as_i64().expect("No prolongation ID");

    let response = client
        .post(format!("{}/prolongations/{}/deny", BASE_URL, manual_id))
        .json(&json!({ "processor_id": 1, "comment": "queue too long" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let denied: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(denied["status"], "Denied");

    // Due date unchanged
    let response = client
        .get(format!("{}/loans/{}/prolongations", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let history: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        history.as_array().expect("Expected array")[0]["prior_due_date"]
            .as_str()
            .expect("No prior due date"),
        due_before
    );
}

#[tokio::test]
#[ignore]
async fn test_genre_limit_enforced() {
    let client = Client::new();

    // Cap Book genre 1 at a single active loan
    let response = client
        .put(format!("{}/limits", BASE_URL))
        .json(&json!({
            "kind": "Borrowing",
            "structure_id": 1,
            "module": "Book",
            "genre_id": 1,
            "genre_name": "novels",
            "max_count": 1,
            "is_active": true
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let first = register_copy(&client, "TST000LIMIT1").await;
    let second = register_copy(&client, "TST000LIMIT2").await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": first, "user_id": 400 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Second loan in the same genre exceeds the cap
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": second, "user_id": 400 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // Another user is unaffected
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": second, "user_id": 401 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Deactivate the cap again
    let response = client
        .put(format!("{}/limits", BASE_URL))
        .json(&json!({
            "kind": "Borrowing",
            "structure_id": 1,
            "module": "Book",
            "genre_id": 1,
            "max_count": 1,
            "is_active": false
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_connector_resolution_hierarchy() {
    let client = Client::new();

    // Global default
    let response = client
        .post(format!("{}/connectors", BASE_URL))
        .json(&json!({
            "name": "smtp-global",
            "channel": "Email",
            "structure_id": null,
            "is_default": true
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let global: Value = response.json().await.expect("Failed to parse response");

    // Structure default
    let response = client
        .post(format!("{}/connectors", BASE_URL))
        .json(&json!({
            "name": "smtp-branch-9",
            "channel": "Email",
            "structure_id": 9,
            "is_default": true
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let branch: Value = response.json().await.expect("Failed to parse response");

    // Unconfigured structure falls back to the global default
    let response = client
        .get(format!(
            "{}/connectors/resolve?structure_id=8&event_code=loan.checkout&channel=Email",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let resolved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(resolved["layer"], "global_default");
    assert_eq!(resolved["connector"]["id"], global["id"]);

    // Structure 9 resolves its own default
    let response = client
        .get(format!(
            "{}/connectors/resolve?structure_id=9&event_code=loan.checkout&channel=Email",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");
    let resolved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(resolved["layer"], "structure_default");
    assert_eq!(resolved["connector"]["id"], branch["id"]);

    // Category override beats the structure default
    let response = client
        .put(format!("{}/connectors/overrides/category", BASE_URL))
        .json(&json!({
            "structure_id": 9,
            "category": "Circulation",
            "email_connector_id": global["id"],
            "sms_connector_id": null
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!(
            "{}/connectors/resolve?structure_id=9&event_code=loan.checkout&channel=Email",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");
    let resolved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(resolved["layer"], "category");

    // Clearing the override falls back to the structure default
    let response = client
        .delete(format!(
            "{}/connectors/overrides/category?structure_id=9&category=Circulation",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!(
            "{}/connectors/resolve?structure_id=9&event_code=loan.checkout&channel=Email",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");
    let resolved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(resolved["layer"], "structure_default");
}

#[tokio::test]
#[ignore]
async fn test_lot_issue_assign_exhaust() {
    let client = Client::new();

    let response = client
        .post(format!("{}/lots", BASE_URL))
        .json(&json!({
            "module": "Game",
            "quantity": 2,
            "structure_id": null,
            "group_id": null,
            "created_by": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let lot: Value = response.json().await.expect("Failed to parse response");
    let lot_id = lot["id"].as_i64().expect("No lot ID");
    assert_eq!(lot["status"], "Active");
    assert_eq!(lot["used"], 0);

    // Draw both codes; they are consecutive and G-prefixed
    let response = client
        .post(format!("{}/lots/{}/assign", BASE_URL, lot_id))
        .send()
        .await
        .expect("Failed to send request");
    let first: Value = response.json().await.expect("Failed to parse response");
    let first_code = first["barcode"].as_str().expect("No barcode").to_string();
    assert!(first_code.starts_with('G'));

    let response = client
        .post(format!("{}/lots/{}/assign", BASE_URL, lot_id))
        .send()
        .await
        .expect("Failed to send request");
    let second: Value = response.json().await.expect("Failed to parse response");
    assert!(second["barcode"].as_str().expect("No barcode") > first_code.as_str());

    // Exhausted: the lot auto-completed, further draws conflict
    let response = client
        .post(format!("{}/lots/{}/assign", BASE_URL, lot_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/lots/{}", BASE_URL, lot_id))
        .send()
        .await
        .expect("Failed to send request");
    let lot: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(lot["status"], "Complete");
    assert_eq!(lot["used"], 2);

    // Complete lots cannot be cancelled
    let response = client
        .post(format!("{}/lots/{}/cancel", BASE_URL, lot_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_archived_copy_is_terminal() {
    let client = Client::new();
    let copy_id = register_copy(&client, "TST0000ARCHV").await;

    let response = client
        .put(format!("{}/copies/{}/status", BASE_URL, copy_id))
        .json(&json!({ "status": "Archived" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // No way back
    let response = client
        .put(format!("{}/copies/{}/status", BASE_URL, copy_id))
        .json(&json!({ "status": "Available" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Not lendable either
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "copy_id": copy_id, "user_id": 500 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}
