//! End-to-end board scenarios driven through the controller, the way a
//! browser host would drive it.

use cb_core::geometry::{path_data, shape_path};
use cb_core::{BoardConfig, LinkStyle, Point, Size};
use cb_editor::{BoardController, InputEvent, MenuAction, MenuTarget};
use cb_render::TextMode;
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Palette visible, identity view over a 1000×800 viewport.
fn board() -> BoardController {
    init_logging();
    let mut board = BoardController::new(BoardConfig::default(), Size::new(1000.0, 800.0));
    board.toggle_palette();
    board
}

/// Drag palette item `index` onto the board at a screen position.
fn drop_item(board: &mut BoardController, index: usize, at: Point) {
    let from = board.palette()[index].at;
    board.handle(&InputEvent::pointer_down(from.x, from.y));
    board.handle(&InputEvent::pointer_move(at.x, at.y));
    board.handle(&InputEvent::pointer_up(at.x, at.y));
}

fn click(board: &mut BoardController, at: Point) {
    board.handle(&InputEvent::pointer_down(at.x, at.y));
    board.handle(&InputEvent::pointer_up(at.x, at.y));
}

#[test]
fn two_selected_circles_link_as_a_curve() {
    let mut board = board();
    // 100 board units apart, away from the palette column.
    drop_item(&mut board, 0, Point::new(300.0, 300.0));
    drop_item(&mut board, 0, Point::new(400.0, 300.0));
    let ids: Vec<_> = board.engine().store.nodes().map(|n| n.id).collect();
    assert_eq!(ids.len(), 2);

    // Click near the edge of each circle, away from the centre handles.
    click(&mut board, Point::new(315.0, 300.0));
    click(&mut board, Point::new(415.0, 300.0));
    assert_eq!(board.engine().store.selection(), ids.as_slice());
    assert!(board.engine().scene.node(ids[0]).unwrap().selected);

    board.handle(&InputEvent::ContextMenu { x: 315.0, y: 300.0 });
    assert_eq!(board.menu().map(|m| m.target), Some(MenuTarget::Node(ids[0])));
    let commit = board.menu_action(&MenuAction::LinkItems);
    assert_eq!(commit.created.len(), 1);

    let store = &board.engine().store;
    let links: Vec<_> = store.links().collect();
    assert_eq!(links.len(), 1);
    assert_eq!((links[0].source, links[0].target), (ids[0], ids[1]));
    assert_eq!(links[0].style, LinkStyle::Bezier);
    assert_eq!(links[0].distance, 100.0);
    assert!(store.selection().is_empty());
    assert!(!board.engine().scene.node(ids[0]).unwrap().selected);
}

#[test]
fn double_toggle_restores_selection() {
    let mut board = board();
    drop_item(&mut board, 1, Point::new(300.0, 300.0));
    let id = board.engine().store.nodes().next().unwrap().id;
    click(&mut board, Point::new(310.0, 305.0));
    click(&mut board, Point::new(310.0, 305.0));
    assert!(board.engine().store.selection().is_empty());
    assert!(!board.engine().scene.node(id).unwrap().selected);
}

#[test]
fn text_edit_commits_on_blur() {
    let mut board = board();
    drop_item(&mut board, 4, Point::new(300.0, 300.0));
    let id = board.engine().store.texts()[0].id;
    assert_eq!(board.engine().store.texts()[0].text, "Text");

    board.handle(&InputEvent::DoubleClick { x: 310.0, y: 310.0 });
    assert_eq!(
        board.engine().scene.text(id).unwrap().mode,
        TextMode::Editing {
            draft: "Text".into()
        }
    );
    assert!(board.render_svg().contains("<textarea"));

    board.text_input(id, "Hello");
    assert!(board.text_blur(id).unwrap());
    assert_eq!(board.engine().store.text(id).unwrap().text, "Hello");
    assert_eq!(board.engine().scene.text(id).unwrap().mode, TextMode::Static);
    assert!(board.render_svg().contains(">Hello</p>"));
}

#[test]
fn pressing_elsewhere_also_commits_the_edit() {
    let mut board = board();
    drop_item(&mut board, 4, Point::new(300.0, 300.0));
    let id = board.engine().store.texts()[0].id;
    board.handle(&InputEvent::DoubleClick { x: 310.0, y: 310.0 });
    board.text_input(id, "Draft");
    click(&mut board, Point::new(800.0, 700.0));
    assert_eq!(board.engine().store.text(id).unwrap().text, "Draft");
}

#[test]
fn control_point_drag_rewrites_one_point() {
    let mut board = board();
    drop_item(&mut board, 2, Point::new(300.0, 300.0));
    let id = board.engine().store.nodes().next().unwrap().id;

    // Triangle point tag 1 sits at local (30,30).
    board.handle(&InputEvent::pointer_down(330.0, 330.0));
    board.handle(&InputEvent::pointer_move(340.0, 320.0));
    board.handle(&InputEvent::pointer_move(350.0, 310.0));
    board.handle(&InputEvent::pointer_up(350.0, 310.0));

    let node = board.engine().store.node(id).unwrap();
    let cmds = shape_path(node.shape, node.points()).unwrap();
    assert_eq!(path_data(&cmds), "M 0,-30 L 50,10 L -30,30 Z");
    assert_eq!(
        board.engine().scene.node(id).unwrap().path.as_deref(),
        Some("M 0,-30 L 50,10 L -30,30 Z")
    );
}

#[test]
fn node_drag_moves_links_with_it() {
    let mut board = board();
    drop_item(&mut board, 1, Point::new(300.0, 300.0));
    drop_item(&mut board, 1, Point::new(500.0, 300.0));
    let ids: Vec<_> = board.engine().store.nodes().map(|n| n.id).collect();
    click(&mut board, Point::new(310.0, 305.0));
    click(&mut board, Point::new(510.0, 305.0));
    board.handle(&InputEvent::ContextMenu { x: 510.0, y: 305.0 });
    board.menu_action(&MenuAction::LinkItems);

    board.handle(&InputEvent::pointer_down(310.0, 305.0));
    board.handle(&InputEvent::pointer_move(310.0, 405.0));
    board.handle(&InputEvent::pointer_up(310.0, 405.0));

    assert_eq!(board.engine().store.node(ids[0]).unwrap().position(), (300.0, 400.0));
    let link = &board.engine().scene.links()[0];
    assert_eq!(link.d, "M300,400 Q400,350 500,300");
    // A drag is not a click: selection untouched.
    assert!(board.engine().store.selection().is_empty());
}

#[test]
fn removing_a_node_from_its_menu_cascades() {
    let mut board = board();
    drop_item(&mut board, 3, Point::new(300.0, 300.0));
    drop_item(&mut board, 3, Point::new(500.0, 300.0));
    click(&mut board, Point::new(310.0, 305.0));
    click(&mut board, Point::new(510.0, 305.0));
    board.handle(&InputEvent::ContextMenu { x: 310.0, y: 305.0 });
    board.menu_action(&MenuAction::LinkItems);
    assert_eq!(board.engine().store.link_count(), 1);

    board.handle(&InputEvent::ContextMenu { x: 510.0, y: 305.0 });
    let commit = board.menu_action(&MenuAction::RemoveNode);
    assert_eq!(commit.report.nodes.removed.len(), 1);
    assert_eq!(commit.report.links.removed.len(), 1);
    assert_eq!(board.engine().store.link_count(), 0);
    assert!(board.engine().scene.links().is_empty());
}

#[test]
fn drop_over_the_palette_is_cancelled() {
    let mut board = board();
    drop_item(&mut board, 0, Point::new(90.0, 300.0));
    assert_eq!(board.engine().store.node_count(), 0);
}

#[test]
fn double_click_on_background_zooms_in() {
    let mut board = board();
    board.handle(&InputEvent::DoubleClick { x: 500.0, y: 400.0 });
    assert_eq!(board.engine().view().k, 2.0);
    for _ in 0..10 {
        board.handle(&InputEvent::DoubleClick { x: 500.0, y: 400.0 });
    }
    assert_eq!(board.engine().view().k, 10.0);
}

#[test]
fn dragging_the_link_control_bends_the_curve() {
    let mut board = board();
    drop_item(&mut board, 1, Point::new(300.0, 300.0));
    drop_item(&mut board, 1, Point::new(500.0, 300.0));
    click(&mut board, Point::new(310.0, 305.0));
    click(&mut board, Point::new(510.0, 305.0));
    board.handle(&InputEvent::ContextMenu { x: 510.0, y: 305.0 });
    board.menu_action(&MenuAction::LinkItems);
    let link = board.engine().store.links().next().unwrap().id;
    assert_eq!(board.engine().scene.link(link).unwrap().d, "M300,300 Q400,300 500,300");

    board.handle(&InputEvent::pointer_down(400.0, 300.0));
    board.handle(&InputEvent::pointer_move(400.0, 320.0));
    board.handle(&InputEvent::pointer_move(400.0, 340.0));
    board.handle(&InputEvent::pointer_up(400.0, 340.0));

    let stored = board.engine().store.link(link).unwrap();
    assert_eq!((stored.cx, stored.cy), (0.0, 40.0));
    let visual = board.engine().scene.link(link).unwrap();
    assert_eq!(visual.control, Point::new(400.0, 340.0));
    assert_eq!(visual.d, "M300,300 Q400,380 500,300");

    // Released: further moves leave the curve alone.
    board.handle(&InputEvent::pointer_move(450.0, 450.0));
    assert_eq!(board.engine().scene.link(link).unwrap().d, "M300,300 Q400,380 500,300");
    assert!(board.engine().store.selection().is_empty());
}

#[test]
fn dragging_a_text_block_moves_it() {
    let mut board = board();
    drop_item(&mut board, 4, Point::new(300.0, 300.0));
    let id = board.engine().store.texts()[0].id;

    board.handle(&InputEvent::pointer_down(310.0, 310.0));
    board.handle(&InputEvent::pointer_move(340.0, 320.0));
    board.handle(&InputEvent::pointer_move(360.0, 330.0));
    board.handle(&InputEvent::pointer_up(360.0, 330.0));

    let text = board.engine().store.text(id).unwrap();
    assert_eq!((text.x, text.y), (350.0, 320.0));
    let visual = board.engine().scene.text(id).unwrap();
    assert_eq!((visual.x, visual.y), (350.0, 320.0));

    // An open editor keeps the block in place.
    board.handle(&InputEvent::DoubleClick { x: 360.0, y: 330.0 });
    board.handle(&InputEvent::pointer_down(360.0, 330.0));
    board.handle(&InputEvent::pointer_move(400.0, 400.0));
    board.handle(&InputEvent::pointer_up(400.0, 400.0));
    let text = board.engine().store.text(id).unwrap();
    assert_eq!((text.x, text.y), (350.0, 320.0));
}
