use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;
use mpcbench_core::AxisSweep;

fn seconds(t: f64) -> String {
	if t.is_nan() { "NaN".to_string() } else { format!("{t:.9}") }
}

pub fn table(sweep: &AxisSweep) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL).set_header(vec![
		Cell::new(sweep.axis.name()),
		Cell::new("user update (s)"),
		Cell::new("item update (s)"),
	]);
	for ((v, user), item) in sweep.values.iter().zip(&sweep.user_times).zip(&sweep.item_times) {
		table.add_row(vec![Cell::new(v), Cell::new(seconds(*user)), Cell::new(seconds(*item))]);
	}
	table
}

pub fn print(sweeps: &[AxisSweep]) {
	for sweep in sweeps {
		let missing = sweep.missing();
		let title = format!("{} sweep ({} points, {missing} missing)", sweep.axis.noun(), sweep.values.len());
		if missing > 0 { println!("{}", style(title).yellow()); } else { println!("{}", style(title).bold()); }
		println!("{}", table(sweep));
	}
}
