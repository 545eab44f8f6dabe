use fireline_dom::{diff::reconcile, HostRuntime, NoopRuntime};
use std::{cell::Cell, rc::Rc, sync::Once};
use wasm_bindgen::{closure::Closure, JsCast};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Document, Element, HtmlTemplateElement, MutationObserver, MutationObserverInit, Node};

wasm_bindgen_test_configure!(run_in_browser);

const DEPTH_LIMIT: usize = 32;

#[wasm_bindgen_test]
fn identical_trees_cause_zero_mutations() {
	let (document, container) = fixture(r#"<div id="a" class="x"><p>hi</p><ul><li>1</li><li>2</li></ul></div>"#);
	let fresh = parse(&document, r#"<div id="a" class="x"><p>hi</p><ul><li>1</li><li>2</li></ul></div>"#);

	let callback = Closure::<dyn FnMut()>::new(|| ());
	let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).unwrap();
	let options = MutationObserverInit::new();
	options.set_child_list(true);
	options.set_attributes(true);
	options.set_character_data(true);
	options.set_subtree(true);
	observer.observe_with_options(container.as_ref(), &options).unwrap();

	reconcile(&NoopRuntime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let records = observer.take_records();
	observer.disconnect();
	assert_eq!(records.length(), 0, "expected no mutation records, got {records:?}");

	container.remove();
}

#[wasm_bindgen_test]
fn changed_attribute_is_the_only_edit() {
	let (document, container) = fixture(r#"<div id="a" class="x">hi</div>"#);
	let old = container.first_element_child().unwrap();
	let fresh = parse(&document, r#"<div id="a" class="y">hi</div>"#);

	reconcile(&NoopRuntime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let patched = container.first_element_child().unwrap();
	assert!(patched.is_same_node(Some(old.as_ref())), "element must be patched in place");
	assert_eq!(patched.get_attribute("class").as_deref(), Some("y"));
	assert_eq!(patched.get_attribute("id").as_deref(), Some("a"));
	assert_eq!(patched.text_content().as_deref(), Some("hi"));

	container.remove();
}

#[wasm_bindgen_test]
fn differing_tags_replace_wholesale_even_with_identical_attributes() {
	let (document, container) = fixture(r#"<span id="a" class="x">hi</span>"#);
	let old = container.first_element_child().unwrap();
	let fresh = parse(&document, r#"<div id="a" class="x">hi</div>"#);

	let destroyed = Rc::new(Cell::new(0));
	let runtime = CountingRuntime(Rc::clone(&destroyed));
	reconcile(&runtime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let replaced = container.first_element_child().unwrap();
	assert_eq!(replaced.tag_name(), "DIV");
	assert!(!replaced.is_same_node(Some(old.as_ref())));
	assert_eq!(destroyed.get(), 1, "state must be released exactly once for the replaced element");

	container.remove();
}

#[wasm_bindgen_test]
fn surplus_children_are_trimmed_and_the_rest_untouched() {
	let (document, container) = fixture("<ul><li>1</li><li>2</li></ul>");
	let list = container.first_element_child().unwrap();
	let kept = list.first_element_child().unwrap();
	let fresh = parse(&document, "<ul><li>1</li></ul>");

	reconcile(&NoopRuntime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let list = container.first_element_child().unwrap();
	assert_eq!(list.child_nodes().length(), 1);
	let survivor = list.first_element_child().unwrap();
	assert!(survivor.is_same_node(Some(kept.as_ref())), "the first item must not be recreated");
	assert_eq!(survivor.text_content().as_deref(), Some("1"));

	container.remove();
}

#[wasm_bindgen_test]
fn missing_children_are_appended_in_order() {
	let (document, container) = fixture("<ul><li>1</li></ul>");
	let list = container.first_element_child().unwrap();
	let kept = list.first_element_child().unwrap();
	let fresh = parse(&document, "<ul><li>1</li><li>2</li><li>3</li></ul>");

	reconcile(&NoopRuntime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let list = container.first_element_child().unwrap();
	let items = list.children();
	assert_eq!(items.length(), 3);
	assert!(items.item(0).unwrap().is_same_node(Some(kept.as_ref())));
	let texts: Vec<_> = (0..items.length()).map(|i| items.item(i).unwrap().text_content().unwrap()).collect();
	assert_eq!(texts, ["1", "2", "3"]);

	container.remove();
}

#[wasm_bindgen_test]
fn externally_bound_attributes_survive_removal() {
	let (document, container) = fixture(r#"<div :class="palette" class="x" data-obsolete="1">hi</div>"#);
	let fresh = parse(&document, "<div>hi</div>");

	reconcile(&NoopRuntime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let patched = container.first_element_child().unwrap();
	// `class` is owned by the `:class` binding and must survive; the unbound attribute
	// and the binding declaration itself both follow the new tree.
	assert_eq!(patched.get_attribute("class").as_deref(), Some("x"));
	assert!(!patched.has_attribute("data-obsolete"));
	assert!(!patched.has_attribute(":class"));

	container.remove();
}

#[wasm_bindgen_test]
fn visibility_toggled_style_is_framework_owned() {
	let (document, container) = fixture(r#"<div x-show="open" style="display: none;">hi</div>"#);
	let fresh = parse(&document, r#"<div x-show="open">hi</div>"#);

	reconcile(&NoopRuntime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let patched = container.first_element_child().unwrap();
	assert_eq!(patched.get_attribute("style").as_deref(), Some("display: none;"));

	container.remove();
}

#[wasm_bindgen_test]
fn changed_state_boundary_is_destroyed_and_replaced() {
	let (document, container) = fixture(r#"<div x-data="{ open: false }"><span>inner</span></div>"#);
	let old = container.first_element_child().unwrap();
	let fresh = parse(&document, r#"<div x-data="{ open: true }"><span>inner</span></div>"#);

	let destroyed = Rc::new(Cell::new(0));
	let runtime = CountingRuntime(Rc::clone(&destroyed));
	reconcile(&runtime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let replaced = container.first_element_child().unwrap();
	assert!(!replaced.is_same_node(Some(old.as_ref())), "a broken boundary must be replaced, not patched");
	assert_eq!(replaced.get_attribute("x-data").as_deref(), Some("{ open: true }"));
	assert_eq!(destroyed.get(), 1);

	container.remove();
}

#[wasm_bindgen_test]
fn unchanged_state_boundary_is_patched_in_place() {
	let (document, container) = fixture(r#"<div x-data="{ open: false }"><span>before</span></div>"#);
	let old = container.first_element_child().unwrap();
	let fresh = parse(&document, r#"<div x-data="{ open: false }"><span>after</span></div>"#);

	let destroyed = Rc::new(Cell::new(0));
	let runtime = CountingRuntime(Rc::clone(&destroyed));
	reconcile(&runtime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let patched = container.first_element_child().unwrap();
	assert!(patched.is_same_node(Some(old.as_ref())));
	assert_eq!(patched.text_content().as_deref(), Some("after"));
	assert_eq!(destroyed.get(), 0);

	container.remove();
}

#[wasm_bindgen_test]
fn raw_content_subtrees_are_skipped() {
	let (document, container) = fixture(r#"<div x-text="message">host-rendered</div>"#);
	let fresh = parse(&document, r#"<div x-text="message">server-rendered</div>"#);

	reconcile(&NoopRuntime, container.as_ref(), first_child(&container).as_ref(), fresh.as_ref(), DEPTH_LIMIT).unwrap();

	let patched = container.first_element_child().unwrap();
	assert_eq!(patched.text_content().as_deref(), Some("host-rendered"));

	container.remove();
}

#[wasm_bindgen_test]
fn missing_old_node_is_inserted() {
	let (document, container) = fixture("");
	let fresh = parse(&document, "<p>appended</p>");

	reconcile(&NoopRuntime, container.as_ref(), None, fresh.as_ref(), DEPTH_LIMIT).unwrap();

	assert_eq!(container.child_nodes().length(), 1);
	assert_eq!(container.first_element_child().unwrap().text_content().as_deref(), Some("appended"));

	container.remove();
}

struct CountingRuntime(Rc<Cell<usize>>);
impl HostRuntime for CountingRuntime {
	fn destroy_tree(&self, _element: &Element) {
		self.0.set(self.0.get() + 1);
	}
}

static LOG: Once = Once::new();

fn fixture(inner_html: &str) -> (Document, Element) {
	LOG.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let container = document.create_element("div").unwrap();
	container.set_inner_html(inner_html);
	document.body().unwrap().append_child(container.as_ref()).unwrap();
	(document, container)
}

fn parse(document: &Document, html: &str) -> Element {
	let template: HtmlTemplateElement = document.create_element("template").unwrap().dyn_into().unwrap();
	template.set_inner_html(html);
	template.content().first_element_child().unwrap()
}

fn first_child(container: &Element) -> Option<Node> {
	container.first_element_child().map(Into::into)
}
