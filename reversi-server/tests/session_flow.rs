//! End-to-end session scenarios, driven through `Session` and `Room` without sockets.

use reversi_core::{Pos, Side, Winner};
use tokio::sync::mpsc;

use reversi_server::protocol::{self, ServerMessage, UpdatePayload};
use reversi_server::transport::Room;
use reversi_server::{ConnId, Delivery, Recipient, RegistryError, Session};

const BLACK: ConnId = ConnId(1);
const WHITE: ConnId = ConnId(2);

fn move_frame(row: u8, col: u8) -> String {
    format!(r#"{{"type":"MOVE","payload":{{"row":{row},"col":{col}}}}}"#)
}

fn seated() -> Session {
    let mut session = Session::new();
    session.connect(BLACK).unwrap();
    session.connect(WHITE).unwrap();
    session
}

fn only_update(deliveries: &[Delivery]) -> &UpdatePayload {
    assert_eq!(deliveries.len(), 1, "{deliveries:?}");
    assert_eq!(deliveries[0].to, Recipient::All);
    match &deliveries[0].message {
        ServerMessage::Update(update) => update,
        other => panic!("expected UPDATE, got {other:?}"),
    }
}

fn only_error(deliveries: &[Delivery], to: ConnId) -> &str {
    assert_eq!(deliveries.len(), 1, "{deliveries:?}");
    assert_eq!(deliveries[0].to, Recipient::One(to));
    match &deliveries[0].message {
        ServerMessage::Error { message } => message,
        other => panic!("expected ERROR, got {other:?}"),
    }
}

#[test]
fn test_opening_move_flips_center() {
    let mut session = seated();
    let deliveries = session.handle_text(BLACK, &move_frame(2, 3));
    let update = only_update(&deliveries);

    assert_eq!(update.board[3][3], Some(Side::Black));
    assert_eq!(update.board[2][3], Some(Side::Black));
    assert_eq!((update.black_count, update.white_count), (4, 1));
    assert_eq!(update.current_player, Side::White);
    assert!(!update.game_over);
    assert_eq!(update.winner, None);
    assert_eq!(update.valid_moves, vec![[2, 2], [2, 4], [4, 2]]);
}

#[test]
fn test_third_connection_gets_room_full() {
    let mut session = seated();
    let before = session.update_message();

    let err = session.connect(ConnId(3)).unwrap_err();
    assert_eq!(err, RegistryError::RoomFull);

    // Existing players are unaffected and can keep playing.
    assert_eq!(session.registry().side_of(BLACK), Some(Side::Black));
    assert_eq!(session.registry().side_of(WHITE), Some(Side::White));
    assert_eq!(session.update_message(), before);
    assert!(session.handle_text(ConnId(3), &move_frame(2, 3)).is_empty());
    only_update(&session.handle_text(BLACK, &move_frame(2, 3)));
}

#[test]
fn test_room_refuses_third_socket_with_room_full_frame() {
    let mut room = Room::new();
    let mut inboxes = Vec::new();
    for id in 1..=2 {
        let (outbox, inbox) = mpsc::unbounded_channel();
        room.join(ConnId(id), outbox).unwrap();
        inboxes.push(inbox);
    }

    let (outbox, mut inbox) = mpsc::unbounded_channel();
    let refusal = room.join(ConnId(3), outbox).unwrap_err();
    assert_eq!(
        protocol::encode(&refusal).unwrap(),
        r#"{"type":"ERROR","payload":{"message":"room full"}}"#
    );
    assert!(inbox.try_recv().is_err());
    assert_eq!(room.session().registry().len(), 2);

    // The seated players still get broadcasts.
    room.handle_text(BLACK, &move_frame(2, 3));
    for inbox in &mut inboxes {
        let mut last = None;
        while let Ok(message) = inbox.try_recv() {
            last = Some(message);
        }
        assert!(matches!(last, Some(ServerMessage::Update(_))));
    }
}

#[test]
fn test_move_out_of_turn_leaves_state_unchanged() {
    let mut session = seated();
    let before = session.update_message();

    let deliveries = session.handle_text(WHITE, &move_frame(2, 4));
    assert_eq!(only_error(&deliveries, WHITE), "not your turn");
    assert_eq!(session.update_message(), before);

    // The next accepted broadcast is derived from the untouched opening.
    let outcomes = session.handle_text(BLACK, &move_frame(2, 3));
    let update = only_update(&outcomes);
    assert_eq!((update.black_count, update.white_count), (4, 1));
}

#[test]
fn test_malformed_and_out_of_range_frames() {
    let mut session = seated();
    let before = session.update_message();

    assert!(only_error(&session.handle_text(BLACK, "garbage"), BLACK).starts_with("invalid message"));
    assert!(only_error(&session.handle_text(BLACK, r#"{"type":"PASS"}"#), BLACK)
        .starts_with("invalid message"));
    assert_eq!(
        only_error(
            &session.handle_text(BLACK, r#"{"type":"MOVE","payload":{"row":8,"col":8}}"#),
            BLACK
        ),
        "coordinates out of range"
    );
    assert_eq!(session.update_message(), before);
}

#[test]
fn test_full_game_reaches_terminal_state() {
    let mut session = seated();
    let mut last = match session.update_message() {
        ServerMessage::Update(update) => update,
        other => panic!("unexpected {other:?}"),
    };

    let mut moves = 0;
    while !last.game_over {
        // Always take the first listed move.
        let [row, col] = last.valid_moves[0];
        let conn = match last.current_player {
            Side::Black => BLACK,
            Side::White => WHITE,
        };
        let deliveries = session.handle_text(conn, &move_frame(row, col));
        let update = only_update(&deliveries).clone();

        assert_eq!(
            update.black_count as u32 + update.white_count as u32,
            last.black_count as u32 + last.white_count as u32 + 1
        );
        if !update.game_over {
            assert!(!update.valid_moves.is_empty());
        }
        last = update;
        moves += 1;
        assert!(moves <= 60);
    }

    let expected = Winner::from_counts(last.black_count, last.white_count);
    assert_eq!(last.winner, Some(expected));
    assert!(last.valid_moves.is_empty());

    // Further moves are refused until someone restarts.
    let deliveries = session.handle_text(BLACK, &move_frame(0, 0));
    assert_eq!(only_error(&deliveries, BLACK), "game is over");

    let update = only_update(&session.handle_text(WHITE, r#"{"type":"RESTART"}"#)).clone();
    assert!(!update.game_over);
    assert_eq!(update.current_player, Side::Black);
    assert_eq!((update.black_count, update.white_count), (2, 2));
}

#[test]
fn test_disconnect_does_not_pause_game() {
    let mut session = seated();
    only_update(&session.handle_text(BLACK, &move_frame(2, 3)));

    session.disconnect(WHITE);
    assert_eq!(session.state().side_to_move, Side::White);

    let deliveries = session.connect(ConnId(9)).unwrap();
    assert_eq!(
        deliveries[0],
        Delivery::to(ConnId(9), ServerMessage::Assigned { color: Side::White })
    );
    match &deliveries[1].message {
        ServerMessage::Update(update) => {
            assert_eq!(update.last_move, Some([2, 3]));
            assert_eq!(update.current_player, Side::White);
        }
        other => panic!("unexpected {other:?}"),
    }

    only_update(&session.handle_text(ConnId(9), &move_frame(2, 2)));
    assert_eq!(session.state().last_move, Some(Pos::from_row_col(2, 2)));
}
