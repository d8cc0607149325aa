use std::collections::HashMap;

use facet_testhelpers::test;
use finegrain::{
    ChangeType, EntityType, Modifiers, NodeData, SourceRange, StructureEntity, Tree,
};
use finegrain_history::{
    AstHelper, ClassHistory, DistillError, Distiller, StructureDiffNode, StructureKind,
};

/// One version of a source file, with trees registered by range offset.
#[derive(Default)]
struct Source {
    package: String,
    modifiers: HashMap<usize, Modifiers>,
    declarations: HashMap<usize, Tree>,
    bodies: HashMap<usize, Tree>,
    texts: HashMap<usize, String>,
}

impl Source {
    fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            ..Self::default()
        }
    }

    fn body(mut self, offset: usize, tree: Tree) -> Self {
        self.bodies.insert(offset, tree);
        self
    }

    fn declaration(mut self, offset: usize, tree: Tree) -> Self {
        self.declarations.insert(offset, tree);
        self
    }

    fn text(mut self, offset: usize, text: &str) -> Self {
        self.texts.insert(offset, text.to_string());
        self
    }
}

/// Front ends name the root after the entity they were asked for.
fn rooted(tree: &Tree, name: &str) -> Tree {
    let mut tree = tree.clone();
    let root = tree.root;
    tree.get_mut(root).value = name.to_string();
    tree
}

impl AstHelper for Source {
    fn top_level_name(&self) -> &str {
        &self.package
    }

    fn modifiers(&self, range: SourceRange) -> Modifiers {
        self.modifiers
            .get(&range.offset)
            .copied()
            .unwrap_or(Modifiers::PUBLIC)
    }

    fn declaration_tree(&self, name: &str, range: SourceRange) -> Option<Tree> {
        self.declarations.get(&range.offset).map(|t| rooted(t, name))
    }

    fn body_tree(&self, name: &str, range: SourceRange) -> Option<Tree> {
        self.bodies.get(&range.offset).map(|t| rooted(t, name))
    }

    fn source_text(&self, range: SourceRange) -> Option<String> {
        self.texts.get(&range.offset).cloned()
    }
}

fn body(statements: &[&str]) -> Tree {
    let mut tree = Tree::new(NodeData::new(EntityType::RootNode, ""));
    for statement in statements {
        tree.add_child(
            tree.root,
            NodeData::new(EntityType::ExpressionStatement, *statement),
        );
    }
    tree
}

fn method_declaration(name: &str) -> Tree {
    let mut tree = Tree::new(NodeData::new(EntityType::RootNode, ""));
    let decl = tree.add_child(tree.root, NodeData::new(EntityType::MethodDeclaration, name));
    let mods = tree.add_child(decl, NodeData::new(EntityType::Modifiers, ""));
    tree.add_child(mods, NodeData::new(EntityType::Modifier, "public"));
    tree
}

fn range(offset: usize, length: usize) -> SourceRange {
    SourceRange::new(offset, length)
}

/// `Foo.java` holding class `Foo` with the given members.
fn unit(members: Vec<StructureDiffNode>) -> StructureDiffNode {
    StructureDiffNode::changed(StructureKind::Other, "Foo.java", range(0, 1000), range(0, 1000))
        .with_child(
            StructureDiffNode::changed(StructureKind::Class, "Foo", range(10, 900), range(10, 900))
                .with_children(members),
        )
}

fn change_types(history: &ClassHistory) -> Vec<ChangeType> {
    history.changes().iter().map(|c| c.change_type).collect()
}

#[test]
fn changed_method_body_is_recorded() {
    let left = Source::new("org.example").body(20, body(&["a();"]));
    let right = Source::new("org.example").body(20, body(&["a();", "b();"]));
    let diff = unit(vec![StructureDiffNode::changed(
        StructureKind::Method,
        "bar()",
        range(20, 30),
        range(20, 40),
    )]);

    let distillation = Distiller::new(&left, &right).distill(&diff).unwrap().unwrap();

    assert_eq!(distillation.history.entity.unique_name, "org.example.Foo");
    let bar = distillation
        .history
        .method("org.example.Foo.bar()")
        .expect("bar has a history");
    assert_eq!(bar.versions.len(), 1);
    let changes = &bar.versions[0].changes;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change_type, ChangeType::StatementInsert);
    assert_eq!(changes[0].changed.unique_name, "b();");
    assert_eq!(changes[0].root.unique_name, "org.example.Foo.bar()");
    assert_eq!(distillation.changes, changes.clone());
}

#[test]
fn members_keep_input_order() {
    let left = Source::new("org.example")
        .body(20, body(&["a();"]))
        .body(60, body(&["x();"]));
    let right = Source::new("org.example")
        .body(20, body(&["a();", "b();"]))
        .body(60, body(&["x();", "y();"]));
    let diff = unit(vec![
        StructureDiffNode::changed(StructureKind::Method, "alpha()", range(20, 30), range(20, 40)),
        StructureDiffNode::changed(StructureKind::Method, "beta()", range(60, 30), range(60, 40)),
    ]);

    let distillation = Distiller::new(&left, &right).distill(&diff).unwrap().unwrap();

    let roots: Vec<_> = distillation
        .changes
        .iter()
        .map(|c| c.root.unique_name.as_str())
        .collect();
    assert_eq!(roots, vec!["org.example.Foo.alpha()", "org.example.Foo.beta()"]);
}

#[test]
fn renamed_method_is_one_refactoring() {
    let left = Source::new("org.example")
        .declaration(100, method_declaration("computeTotal"))
        .body(100, body(&["sum();"]));
    let right = Source::new("org.example")
        .declaration(100, method_declaration("computeTotals"))
        .body(100, body(&["sum();"]));
    let diff = unit(vec![
        StructureDiffNode::deleted(StructureKind::Method, "computeTotal()", range(100, 40)),
        StructureDiffNode::added(StructureKind::Method, "computeTotals()", range(100, 41)),
    ]);

    let distillation = Distiller::new(&left, &right).distill(&diff).unwrap().unwrap();

    assert_eq!(change_types(&distillation.history), vec![ChangeType::MethodRenaming]);
    let renamed = distillation
        .history
        .method("org.example.Foo.computeTotals()")
        .expect("history filed under the new name");
    let change = &renamed.versions[0].changes[0];
    assert_eq!(change.changed.unique_name, "computeTotal");
    assert_eq!(
        change.new_entity().map(|e| e.unique_name.as_str()),
        Some("computeTotals")
    );
    assert!(distillation.history.method("org.example.Foo.computeTotal()").is_none());
}

#[test]
fn renamed_method_with_same_parameters_is_a_refactoring() {
    let left = Source::new("org.example");
    let right = Source::new("org.example");
    let diff = unit(vec![
        StructureDiffNode::deleted(StructureKind::Method, "load(String, Options)", range(100, 60)),
        StructureDiffNode::added(StructureKind::Method, "read(String, Options)", range(100, 60)),
    ]);

    let distillation = Distiller::new(&left, &right).distill(&diff).unwrap().unwrap();

    assert_eq!(change_types(&distillation.history), vec![ChangeType::MethodRenaming]);
    let read = distillation
        .history
        .method("org.example.Foo.read(String, Options)")
        .expect("history filed under the new signature");
    let change = &read.versions[0].changes[0];
    assert_eq!(change.changed.unique_name, "load");
    assert_eq!(change.new_entity().map(|e| e.unique_name.as_str()), Some("read"));
}

#[test]
fn renamed_field_without_trees_still_reports_the_renaming() {
    let left = Source::new("org.example").text(300, "private int count;");
    let right = Source::new("org.example").text(300, "private int counter;");
    let diff = unit(vec![
        StructureDiffNode::deleted(StructureKind::Field, "count : int", range(300, 18)),
        StructureDiffNode::added(StructureKind::Field, "counter : int", range(300, 20)),
    ]);

    let distillation = Distiller::new(&left, &right).distill(&diff).unwrap().unwrap();

    let counter = distillation
        .history
        .attribute("org.example.Foo.counter : int")
        .expect("renamed field has a history");
    let change = &counter.versions[0].changes[0];
    assert_eq!(change.change_type, ChangeType::AttributeRenaming);
    assert_eq!(change.changed.entity_type, EntityType::FieldDeclaration);
    assert_eq!(change.changed.unique_name, "count");
    assert_eq!(change.parent.unique_name, "org.example.Foo");
}

#[test]
fn unrelated_members_are_plain_additions_and_removals() {
    let left = Source::new("org.example");
    let right = Source::new("org.example");
    let diff = unit(vec![
        StructureDiffNode::added(StructureKind::Method, "flush()", range(500, 20)),
        StructureDiffNode::deleted(StructureKind::Method, "open()", range(520, 20)),
    ]);

    let distillation = Distiller::new(&left, &right).distill(&diff).unwrap().unwrap();

    let history = &distillation.history;
    assert!(history.methods.is_empty());
    assert_eq!(history.versions.len(), 1, "one class version per pass");
    let types: Vec<_> = history.versions[0]
        .changes
        .iter()
        .map(|c| c.change_type)
        .collect();
    assert_eq!(
        types,
        vec![ChangeType::AdditionalFunctionality, ChangeType::RemovedFunctionality]
    );
    assert_eq!(
        history.versions[0].changes[0].changed.unique_name,
        "org.example.Foo.flush()"
    );
}

#[test]
fn inner_classes_get_their_own_history() {
    let left = Source::new("org.example").body(210, body(&["go();"]));
    let right = Source::new("org.example").body(210, body(&["go();", "stop();"]));
    let diff = unit(vec![
        StructureDiffNode::changed(StructureKind::Class, "Inner", range(200, 100), range(200, 120))
            .with_child(StructureDiffNode::changed(
                StructureKind::Method,
                "run()",
                range(210, 50),
                range(210, 60),
            )),
        StructureDiffNode::changed(StructureKind::Class, "Quiet", range(400, 10), range(400, 10)),
    ]);

    let distillation = Distiller::new(&left, &right).distill(&diff).unwrap().unwrap();

    let inner = distillation
        .history
        .inner_class("org.example.Foo.Inner")
        .expect("inner class has a history");
    let run = inner.method("org.example.Foo.Inner.run()").expect("run has a history");
    assert_eq!(run.versions[0].changes[0].change_type, ChangeType::StatementInsert);
    assert!(
        distillation.history.inner_class("org.example.Foo.Quiet").is_none(),
        "histories without changes are pruned"
    );
}

#[test]
fn added_top_level_class_is_not_distilled() {
    let left = Source::new("org.example");
    let right = Source::new("org.example");
    let diff = StructureDiffNode::changed(StructureKind::Other, "Foo.java", range(0, 10), range(0, 90))
        .with_child(StructureDiffNode::added(StructureKind::Class, "Foo", range(0, 80)));

    assert_eq!(Distiller::new(&left, &right).distill(&diff).unwrap(), None);
}

#[test]
fn mismatched_tree_roots_are_an_error() {
    let left = Source::new("org.example").body(20, body(&["a();"]));
    let right = Source::new("org.example").body(20, Tree::new(NodeData::new(EntityType::Block, "")));
    let diff = unit(vec![StructureDiffNode::changed(
        StructureKind::Method,
        "bar()",
        range(20, 30),
        range(20, 40),
    )]);

    let error = Distiller::new(&left, &right).distill(&diff).unwrap_err();

    assert_eq!(
        error,
        DistillError::RootLabelMismatch {
            entity: "org.example.Foo.bar()".to_string(),
            left: EntityType::RootNode,
            right: EntityType::Block,
        }
    );
}

#[test]
fn passes_accumulate_in_one_history() {
    let left = Source::new("org.example").body(20, body(&["a();"]));
    let right = Source::new("org.example").body(20, body(&["a();", "b();"]));
    let diff = unit(vec![StructureDiffNode::changed(
        StructureKind::Method,
        "bar()",
        range(20, 30),
        range(20, 40),
    )]);
    let distiller = Distiller::new(&left, &right);
    let mut history = ClassHistory::new(StructureEntity::new(
        EntityType::Class,
        "org.example.Foo",
        Modifiers::PUBLIC,
    ));

    distiller.distill_into(&diff, &mut history).unwrap();
    distiller.distill_into(&diff, &mut history).unwrap();

    assert_eq!(
        history.method("org.example.Foo.bar()").map(|h| h.versions.len()),
        Some(2)
    );
    let json = history.to_json().unwrap();
    assert!(json.contains("StatementInsert"), "{json}");
}
