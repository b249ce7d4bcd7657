use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, warn};

use crate::components::topology_canvas::TopologyCanvas;
use crate::topology::{
	DetailLevel, LayoutOptions, LayoutType, Position, StaticSource, TopologyConfig, TopologyError,
	TopologySession, TopologyView, load_shared,
};

const SAMPLE_NODES: &str = r#"{
	"meta": { "code": 200 },
	"data": [
		{ "url": "/2.2/eeros/1001", "serial": "GGC1001", "is_gateway": true, "status": "green",
		  "location": "Office", "model": "eero Pro 6E", "wired": true, "ip_address": "192.168.4.1",
		  "firmware_version": "v7.2.1", "connected_clients_count": 3 },
		{ "url": "/2.2/eeros/1002", "serial": "GGC1002", "status": "green", "mesh_quality_bars": 4,
		  "location": "Kitchen", "model": "eero 6", "connected_clients_count": 2 },
		{ "url": "/2.2/eeros/1003", "serial": "GGC1003", "status": "green", "mesh_quality_bars": 2,
		  "location": "Bedroom", "model": "eero 6", "connected_clients_count": 2 },
		{ "url": "/2.2/eeros/1004", "serial": "GGC1004", "status": "red", "mesh_quality_bars": 1,
		  "location": "Garage", "model": "eero Beacon" }
	]
}"#;

const SAMPLE_DEVICES: &str = r#"[
	{ "mac": "a4:83:e7:00:00:01", "nickname": "Work laptop", "connected": true, "wireless": false,
	  "connected_to_eero": "Office", "ip": "192.168.4.20", "manufacturer": "Apple" },
	{ "mac": "a4:83:e7:00:00:02", "hostname": "printer", "connected": true, "wireless": true,
	  "connected_to_eero": "office", "signal_strength": -48 },
	{ "mac": "a4:83:e7:00:00:03", "display_name": "TV", "connected": true, "wireless": true,
	  "connected_to_eero_id": "1002", "signal_strength": -61 },
	{ "mac": "a4:83:e7:00:00:04", "nickname": "Fridge", "connected": true, "wireless": true,
	  "connected_to_eero": "Kitchen", "profile_name": "Appliances" },
	{ "mac": "a4:83:e7:00:00:05", "nickname": "Tablet", "connected": false, "wireless": true,
	  "connected_to_eero": "Bedroom" },
	{ "mac": "a4:83:e7:00:00:06", "nickname": "Console", "connected": true, "wireless": true,
	  "connected_to_eero": "Bedroom", "paused": true },
	{ "mac": "a4:83:e7:00:00:07", "hostname": "unknown-iot", "connected": true, "wireless": true,
	  "connected_to_eero": "Attic", "blocked": true }
]"#;

fn sample_source() -> StaticSource {
	StaticSource::from_json(SAMPLE_NODES, SAMPLE_DEVICES).unwrap_or_else(|err| {
		warn!("sample topology did not decode: {err}");
		StaticSource::default()
	})
}

/// Topology page: the canvas plus layout and filter controls.
#[component]
pub fn Home() -> impl IntoView {
	let revision = RwSignal::new(0u64);
	let session = Rc::new(RefCell::new(TopologySession::new(TopologyConfig {
		options: LayoutOptions::default(),
		force_seed: Some(7),
	})));
	session.borrow_mut().subscribe(move |event| {
		debug!("session event: {event:?}");
		revision.try_update(|r| *r += 1);
	});
	let session = StoredValue::new_local(session);
	let source = StoredValue::new(sample_source());

	let topology = Signal::derive(move || {
		revision.track();
		session.with_value(|s| s.borrow().view())
	});
	let options = Signal::derive(move || {
		revision.track();
		session.with_value(|s| s.borrow().options().clone())
	});
	let selected_id = Signal::derive(move || {
		revision.track();
		session.with_value(|s| s.borrow().selected_node_id().map(str::to_string))
	});
	let selected_node = Signal::derive(move || {
		revision.track();
		session.with_value(|s| s.borrow().selected_node())
	});
	let detail = Signal::derive(move || options.get().detail_level);

	let update_options = move |update: Box<dyn FnOnce(&mut LayoutOptions)>| {
		session.with_value(|s| s.borrow_mut().update_options(update));
	};

	let reload = move || {
		let shared = session.get_value();
		let source = source.get_value();
		spawn_local(async move {
			match load_shared(&shared, &source).await {
				Ok(()) => {}
				Err(TopologyError::Superseded { generation }) => {
					debug!("load #{generation} superseded by a newer load")
				}
				Err(err) => debug!("load failed: {err}"),
			}
		});
	};
	reload();

	let on_select = Callback::new(move |id: Option<String>| {
		session.with_value(|s| s.borrow_mut().select(id));
	});
	let on_reposition = Callback::new(move |(id, pos): (String, Position)| {
		session.with_value(|s| s.borrow_mut().reposition(&id, pos));
	});

	let stats = move || {
		topology.with(|v: &TopologyView| {
			let s = v.graph.stats();
			format!(
				"{} gateway, {} relays, {} devices ({} offline), {} poor links",
				s.gateways, s.relays, s.devices, s.offline_devices, s.poor_links
			)
		})
	};

	view! {
		<div class="fullscreen-graph">
			<TopologyCanvas
				view=topology
				detail=detail
				selected=selected_id
				on_select=on_select
				on_reposition=on_reposition
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Mesh Topology"</h1>
				<p class="subtitle">{stats}</p>
				<div class="controls">
					<label>
						"Layout "
						<select
							prop:value=move || options.get().layout_type.as_str()
							on:change=move |ev| {
								if let Some(layout) = LayoutType::parse(&event_target_value(&ev)) {
									update_options(Box::new(move |o: &mut LayoutOptions| o.layout_type = layout));
								}
							}
						>
							{LayoutType::ALL
								.iter()
								.map(|l| view! { <option value=l.as_str()>{l.as_str()}</option> })
								.collect_view()}
						</select>
					</label>
					<label>
						"Detail "
						<select
							prop:value=move || options.get().detail_level.as_str()
							on:change=move |ev| {
								if let Some(level) = DetailLevel::parse(&event_target_value(&ev)) {
									update_options(Box::new(move |o: &mut LayoutOptions| o.detail_level = level));
								}
							}
						>
							{DetailLevel::ALL
								.iter()
								.map(|d| view! { <option value=d.as_str()>{d.as_str()}</option> })
								.collect_view()}
						</select>
					</label>
					<label>
						<input
							type="checkbox"
							prop:checked=move || options.get().show_devices
							on:change=move |ev| {
								let on = event_target_checked(&ev);
								update_options(Box::new(move |o: &mut LayoutOptions| o.show_devices = on));
							}
						/>
						" Devices"
					</label>
					<label>
						<input
							type="checkbox"
							prop:checked=move || options.get().show_offline_devices
							on:change=move |ev| {
								let on = event_target_checked(&ev);
								update_options(Box::new(move |o: &mut LayoutOptions| o.show_offline_devices = on));
							}
						/>
						" Offline devices"
					</label>
					<label>
						<input
							type="checkbox"
							prop:checked=move || options.get().group_by_eero
							on:change=move |ev| {
								let on = event_target_checked(&ev);
								update_options(Box::new(move |o: &mut LayoutOptions| o.group_by_eero = on));
							}
						/>
						" Group by node"
					</label>
					<button on:click=move |_| reload()>"Reload"</button>
				</div>
				{move || {
					selected_node
						.get()
						.map(|node| {
							view! {
								<div class="selection">
									<h2>{node.label.clone()}</h2>
									<ul>
										{node
											.caption(DetailLevel::Detailed)
											.into_iter()
											.skip(1)
											.map(|line| view! { <li>{line}</li> })
											.collect_view()}
									</ul>
								</div>
							}
						})
				}}
			</div>
		</div>
	}
}
