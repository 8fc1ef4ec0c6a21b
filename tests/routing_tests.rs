//! Router tests on the diamond layout

mod common;

use common::{diamond, Diamond};
use rs_trainz_layout::layout::{BlockId, BlockReservation, ElementId, SocketId, TrainId, Train};
use rs_trainz_layout::router::RouteRequest;
use rs_trainz_layout::{
    BlockDirection, Destination, LayoutError, ReservedPolicy, Route, RouteItem, Router,
    RoutingConfig,
};

fn routing() -> RoutingConfig {
    RoutingConfig::default().with_fallback_lengths(0.0, 0.0)
}

fn request(fx: &Diamond, destination: Destination, min_length: f64) -> RouteRequest {
    RouteRequest {
        train: fx.train,
        from: fx.s0,
        direction: BlockDirection::Next,
        destination,
        min_length,
    }
}

/// Another train reserves `block` ahead of itself without standing in it.
fn reserve_for_other(fx: &mut Diamond, block: BlockId) -> TrainId {
    let other = fx.layout.add_train(Train::new("other"));
    fx.layout.block_mut(block).unwrap().reservation = Some(BlockReservation {
        train: other,
        direction: BlockDirection::Next,
    });
    other
}

/// Another train stands in `block`.
fn occupy(fx: &mut Diamond, block: BlockId) -> TrainId {
    let other = reserve_for_other(fx, block);
    fx.layout.train_mut(other).unwrap().block = Some(block);
    other
}

// ============================================================================
// Shortest path
// ============================================================================

#[test]
fn shortest_branch_wins() {
    let fx = diamond();
    let config = routing();
    let path = Router::new(&fx.layout, &config)
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .unwrap();

    assert_eq!(path.blocks(), vec![fx.s0, fx.b1, fx.s1]);
    assert_eq!(path.length, 300.0);
    assert!(path.contains(ElementId::Turnout(fx.ta)));
    assert!(path.contains(ElementId::Turnout(fx.tb)));
    assert!(!path.contains(ElementId::Block(fx.b2)));
}

#[test]
fn path_converts_to_route_items() {
    let fx = diamond();
    let config = routing();
    let destination = Destination::any_direction(fx.s1);
    let path = Router::new(&fx.layout, &config)
        .shortest_path(&request(&fx, destination, 0.0))
        .unwrap()
        .unwrap();
    let route = Route::from_path(&path, destination);

    assert!(route.is_automatic());
    assert_eq!(
        route.items,
        vec![
            RouteItem::Block {
                block: fx.s0,
                direction: BlockDirection::Next,
                wait_secs: None,
            },
            RouteItem::Turnout {
                turnout: fx.ta,
                from: SocketId(0),
                to: SocketId(1),
            },
            RouteItem::Block {
                block: fx.b1,
                direction: BlockDirection::Next,
                wait_secs: None,
            },
            RouteItem::Turnout {
                turnout: fx.tb,
                from: SocketId(1),
                to: SocketId(0),
            },
            RouteItem::Block {
                block: fx.s1,
                direction: BlockDirection::Next,
                wait_secs: None,
            },
        ]
    );
}

#[test]
fn fallback_lengths_apply_to_unknown_lengths() {
    let fx = diamond();
    let config = RoutingConfig::default().with_fallback_lengths(50.0, 5.0);
    let path = Router::new(&fx.layout, &config)
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .unwrap();

    // tA + b1 + tB + s1
    assert_eq!(path.length, 5.0 + 300.0 + 5.0 + 50.0);
}

// ============================================================================
// Other trains
// ============================================================================

#[test]
fn reserved_block_excluded_by_default() {
    let mut fx = diamond();
    let b1 = fx.b1;
    reserve_for_other(&mut fx, b1);
    let config = routing();
    let path = Router::new(&fx.layout, &config)
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .unwrap();

    assert_eq!(path.blocks(), vec![fx.s0, fx.b2, fx.b3, fx.s1]);
    assert_eq!(path.length, 500.0);
}

#[test]
fn penalized_reservations_used_only_as_last_resort() {
    let mut fx = diamond();
    let b1 = fx.b1;
    reserve_for_other(&mut fx, b1);
    let config = routing().with_reserved_policy(ReservedPolicy::Penalize);
    let router = Router::new(&fx.layout, &config);
    let path = router
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .unwrap();
    assert_eq!(path.length, 500.0);

    let b2 = fx.b2;
    reserve_for_other(&mut fx, b2);
    let excluded = routing();
    assert!(Router::new(&fx.layout, &excluded)
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .is_none());

    let path = Router::new(&fx.layout, &config)
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .unwrap();
    assert_eq!(path.blocks(), vec![fx.s0, fx.b1, fx.s1]);
    assert_eq!(path.length, 300.0 + config.reserved_penalty);
}

#[test]
fn occupied_blocks_never_used() {
    let mut fx = diamond();
    let b1 = fx.b1;
    occupy(&mut fx, b1);
    let b2 = fx.b2;
    occupy(&mut fx, b2);
    let config = routing().with_reserved_policy(ReservedPolicy::Penalize);
    assert!(Router::new(&fx.layout, &config)
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .is_none());
}

#[test]
fn own_reservations_do_not_block() {
    let mut fx = diamond();
    fx.layout.block_mut(fx.b1).unwrap().reservation = Some(BlockReservation {
        train: fx.train,
        direction: BlockDirection::Next,
    });
    let config = routing();
    let path = Router::new(&fx.layout, &config)
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .unwrap();
    assert_eq!(path.length, 300.0);
}

#[test]
fn disabled_block_is_skipped() {
    let mut fx = diamond();
    fx.layout.block_mut(fx.b1).unwrap().enabled = false;
    let config = routing();
    let path = Router::new(&fx.layout, &config)
        .shortest_path(&request(&fx, Destination::any_direction(fx.s1), 0.0))
        .unwrap()
        .unwrap();
    assert_eq!(path.blocks(), vec![fx.s0, fx.b2, fx.b3, fx.s1]);
}

// ============================================================================
// Constraints
// ============================================================================

#[test]
fn destination_direction_is_honored() {
    let fx = diamond();
    let config = routing();
    let router = Router::new(&fx.layout, &config);

    let forward = request(&fx, Destination::towards(fx.s1, BlockDirection::Next), 0.0);
    assert!(router.shortest_path(&forward).unwrap().is_some());

    // s1 can only be entered through its previous side
    let backward = request(&fx, Destination::towards(fx.s1, BlockDirection::Previous), 0.0);
    assert!(router.shortest_path(&backward).unwrap().is_none());
}

#[test]
fn start_direction_matters() {
    let fx = diamond();
    let config = routing();
    let mut req = request(&fx, Destination::any_direction(fx.s1), 0.0);
    req.direction = BlockDirection::Previous;
    assert!(Router::new(&fx.layout, &config)
        .shortest_path(&req)
        .unwrap()
        .is_none());
}

#[test]
fn minimum_length_checked_on_first_arrival() {
    let fx = diamond();
    let config = routing();
    let router = Router::new(&fx.layout, &config);

    let exact = request(&fx, Destination::any_direction(fx.s1), 300.0);
    assert!(router.shortest_path(&exact).unwrap().is_some());

    let too_long = request(&fx, Destination::any_direction(fx.s1), 400.0);
    assert!(router.shortest_path(&too_long).unwrap().is_none());
}

#[test]
fn unknown_blocks_are_errors() {
    let fx = diamond();
    let config = routing();
    let req = request(&fx, Destination::any_direction(BlockId(42)), 0.0);
    assert_eq!(
        Router::new(&fx.layout, &config).shortest_path(&req).unwrap_err(),
        LayoutError::BlockNotFound(BlockId(42))
    );
}
