//! Entity vocabulary: node labels, change types and the payload attached to
//! every tree node.

use core::fmt;

use facet::Facet;

/// Closed vocabulary of node labels.
///
/// The language front end maps its native AST node kinds onto these; the
/// matcher compares labels for equality and the classifier keys its rules on
/// them.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntityType {
    /// Root of a declaration or body tree.
    RootNode,

    // Structure entities
    /// A class or interface.
    Class,
    /// A method or constructor.
    Method,
    /// A field.
    Attribute,

    // Declaration parts
    /// Declaration of a class or interface.
    TypeDeclaration,
    /// Declaration of a method or constructor.
    MethodDeclaration,
    /// Declaration of a field.
    FieldDeclaration,
    /// Name of a method.
    MethodName,
    /// Wrapper around the modifiers of a declaration.
    Modifiers,
    /// A single modifier keyword.
    Modifier,
    /// Wrapper around the parameters of a method declaration.
    Parameters,
    /// A single parameter.
    SingleVariableDeclaration,
    /// Wrapper around the implemented interfaces of a type declaration.
    SuperInterfaceTypes,
    /// Type parameters or type arguments.
    TypeArguments,
    /// Type parameter of a generic declaration.
    TypeParameter,
    /// Wrapper around the thrown exception types of a method.
    Throw,
    /// Wrapper around the fragments of a field declaration.
    Fragments,
    /// A single field fragment, `name = initializer`.
    VariableDeclarationFragment,

    // Documentation and comments
    /// Documentation comment.
    Javadoc,
    /// Block comment.
    BlockComment,
    /// Line comment.
    LineComment,

    // Types
    /// Array type.
    ArrayType,
    /// Generic type with arguments.
    ParameterizedType,
    /// Primitive type, including `void`.
    PrimitiveType,
    /// Qualified type name.
    QualifiedType,
    /// Simple type name.
    SimpleType,
    /// Wildcard type argument.
    WildcardType,

    // Statements
    /// `assert` statement.
    AssertStatement,
    /// Assignment.
    Assignment,
    /// Block of statements.
    Block,
    /// `break` statement.
    BreakStatement,
    /// `catch` clause.
    CatchClause,
    /// Wrapper around the `catch` clauses of a `try`.
    CatchClauses,
    /// Object creation.
    ClassInstanceCreation,
    /// `this(...)` invocation.
    ConstructorInvocation,
    /// `continue` statement.
    ContinueStatement,
    /// `do` loop.
    DoStatement,
    /// `else` branch wrapper.
    ElseStatement,
    /// `for (x : xs)` loop.
    EnhancedForStatement,
    /// Expression statement.
    ExpressionStatement,
    /// `finally` block.
    Finally,
    /// `for` loop.
    ForStatement,
    /// `if` statement.
    IfStatement,
    /// Labeled statement.
    LabeledStatement,
    /// Method call.
    MethodInvocation,
    /// Postfix expression, `i++`.
    PostfixExpression,
    /// Prefix expression, `++i`.
    PrefixExpression,
    /// `return` statement.
    ReturnStatement,
    /// `super(...)` invocation.
    SuperConstructorInvocation,
    /// `super.m(...)` invocation.
    SuperMethodInvocation,
    /// `case` label of a `switch`.
    SwitchCase,
    /// `switch` statement.
    SwitchStatement,
    /// `synchronized` block.
    SynchronizedStatement,
    /// `then` branch wrapper.
    ThenStatement,
    /// `throw` statement.
    ThrowStatement,
    /// `try` statement.
    TryStatement,
    /// Local class declaration.
    TypeDeclarationStatement,
    /// Local variable declaration.
    VariableDeclarationStatement,
    /// `while` loop.
    WhileStatement,
}

impl EntityType {
    /// Whether this label denotes a type reference.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            EntityType::ArrayType
                | EntityType::ParameterizedType
                | EntityType::PrimitiveType
                | EntityType::QualifiedType
                | EntityType::SimpleType
                | EntityType::WildcardType
        )
    }

    /// Whether this label denotes a block or line comment.
    pub fn is_comment(self) -> bool {
        matches!(self, EntityType::BlockComment | EntityType::LineComment)
    }

    /// Whether this label is a statement reported on its own.
    ///
    /// Blocks and branch wrappers are structural and not part of this set.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            EntityType::AssertStatement
                | EntityType::Assignment
                | EntityType::BreakStatement
                | EntityType::CatchClause
                | EntityType::ClassInstanceCreation
                | EntityType::ConstructorInvocation
                | EntityType::ContinueStatement
                | EntityType::DoStatement
                | EntityType::EnhancedForStatement
                | EntityType::ExpressionStatement
                | EntityType::Finally
                | EntityType::ForStatement
                | EntityType::IfStatement
                | EntityType::LabeledStatement
                | EntityType::MethodInvocation
                | EntityType::PostfixExpression
                | EntityType::PrefixExpression
                | EntityType::ReturnStatement
                | EntityType::SuperConstructorInvocation
                | EntityType::SuperMethodInvocation
                | EntityType::SwitchCase
                | EntityType::SwitchStatement
                | EntityType::SynchronizedStatement
                | EntityType::ThrowStatement
                | EntityType::TryStatement
                | EntityType::TypeDeclarationStatement
                | EntityType::VariableDeclarationStatement
                | EntityType::WhileStatement
        )
    }

    /// Whether this label is an `if`/`else` branch wrapper.
    pub fn is_branch(self) -> bool {
        matches!(self, EntityType::ThenStatement | EntityType::ElseStatement)
    }

    /// Whether this label is a structure entity owning a change history.
    pub fn is_structure(self) -> bool {
        matches!(
            self,
            EntityType::Class | EntityType::Method | EntityType::Attribute
        )
    }

    /// Statements whose value is a condition expression.
    pub fn has_condition(self) -> bool {
        matches!(
            self,
            EntityType::IfStatement
                | EntityType::ForStatement
                | EntityType::WhileStatement
                | EntityType::DoStatement
                | EntityType::EnhancedForStatement
        )
    }

    /// Upper snake case name, as used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::RootNode => "ROOT_NODE",
            EntityType::Class => "CLASS",
            EntityType::Method => "METHOD",
            EntityType::Attribute => "ATTRIBUTE",
            EntityType::TypeDeclaration => "TYPE_DECLARATION",
            EntityType::MethodDeclaration => "METHOD_DECLARATION",
            EntityType::FieldDeclaration => "FIELD_DECLARATION",
            EntityType::MethodName => "METHOD_NAME",
            EntityType::Modifiers => "MODIFIERS",
            EntityType::Modifier => "MODIFIER",
            EntityType::Parameters => "PARAMETERS",
            EntityType::SingleVariableDeclaration => "SINGLE_VARIABLE_DECLARATION",
            EntityType::SuperInterfaceTypes => "SUPER_INTERFACE_TYPES",
            EntityType::TypeArguments => "TYPE_ARGUMENTS",
            EntityType::TypeParameter => "TYPE_PARAMETER",
            EntityType::Throw => "THROW",
            EntityType::Fragments => "FRAGMENTS",
            EntityType::VariableDeclarationFragment => "VARIABLE_DECLARATION_FRAGMENT",
            EntityType::Javadoc => "JAVADOC",
            EntityType::BlockComment => "BLOCK_COMMENT",
            EntityType::LineComment => "LINE_COMMENT",
            EntityType::ArrayType => "ARRAY_TYPE",
            EntityType::ParameterizedType => "PARAMETERIZED_TYPE",
            EntityType::PrimitiveType => "PRIMITIVE_TYPE",
            EntityType::QualifiedType => "QUALIFIED_TYPE",
            EntityType::SimpleType => "SIMPLE_TYPE",
            EntityType::WildcardType => "WILDCARD_TYPE",
            EntityType::AssertStatement => "ASSERT_STATEMENT",
            EntityType::Assignment => "ASSIGNMENT",
            EntityType::Block => "BLOCK",
            EntityType::BreakStatement => "BREAK_STATEMENT",
            EntityType::CatchClause => "CATCH_CLAUSE",
            EntityType::CatchClauses => "CATCH_CLAUSES",
            EntityType::ClassInstanceCreation => "CLASS_INSTANCE_CREATION",
            EntityType::ConstructorInvocation => "CONSTRUCTOR_INVOCATION",
            EntityType::ContinueStatement => "CONTINUE_STATEMENT",
            EntityType::DoStatement => "DO_STATEMENT",
            EntityType::ElseStatement => "ELSE_STATEMENT",
            EntityType::EnhancedForStatement => "ENHANCED_FOR_STATEMENT",
            EntityType::ExpressionStatement => "EXPRESSION_STATEMENT",
            EntityType::Finally => "FINALLY",
            EntityType::ForStatement => "FOR_STATEMENT",
            EntityType::IfStatement => "IF_STATEMENT",
            EntityType::LabeledStatement => "LABELED_STATEMENT",
            EntityType::MethodInvocation => "METHOD_INVOCATION",
            EntityType::PostfixExpression => "POSTFIX_EXPRESSION",
            EntityType::PrefixExpression => "PREFIX_EXPRESSION",
            EntityType::ReturnStatement => "RETURN_STATEMENT",
            EntityType::SuperConstructorInvocation => "SUPER_CONSTRUCTOR_INVOCATION",
            EntityType::SuperMethodInvocation => "SUPER_METHOD_INVOCATION",
            EntityType::SwitchCase => "SWITCH_CASE",
            EntityType::SwitchStatement => "SWITCH_STATEMENT",
            EntityType::SynchronizedStatement => "SYNCHRONIZED_STATEMENT",
            EntityType::ThenStatement => "THEN_STATEMENT",
            EntityType::ThrowStatement => "THROW_STATEMENT",
            EntityType::TryStatement => "TRY_STATEMENT",
            EntityType::TypeDeclarationStatement => "TYPE_DECLARATION_STATEMENT",
            EntityType::VariableDeclarationStatement => "VARIABLE_DECLARATION_STATEMENT",
            EntityType::WhileStatement => "WHILE_STATEMENT",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much a change can affect other code.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SignificanceLevel {
    /// Documentation and comments only.
    None,
    /// Local edits with no effect on callers.
    Low,
    /// May change behavior observed by callers.
    Medium,
    /// Changes names other code refers to.
    High,
    /// Breaks or changes the contract towards other code.
    Crucial,
}

/// Semantic change taxonomy.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChangeType {
    /// Not classified (yet).
    Unclassified,
    /// A class was added.
    AdditionalClass,
    /// A method was added.
    AdditionalFunctionality,
    /// A field was added.
    AdditionalObjectState,
    /// `final` was removed from a field.
    AddingAttributeModifiability,
    /// `final` was removed from a class.
    AddingClassDerivability,
    /// `final` was removed from a method.
    AddingMethodOverridability,
    /// A field changed its type.
    AttributeTypeChange,
    /// A field was renamed.
    AttributeRenaming,
    /// A class was renamed.
    ClassRenaming,
    /// A comment was removed.
    CommentDelete,
    /// A comment was added.
    CommentInsert,
    /// A comment moved.
    CommentMove,
    /// A comment was edited.
    CommentUpdate,
    /// The condition of a branch or loop changed.
    ConditionExpressionChange,
    /// Visibility went down.
    DecreasingAccessibilityChange,
    /// A documentation comment was removed.
    DocDelete,
    /// A documentation comment was added.
    DocInsert,
    /// A documentation comment was edited.
    DocUpdate,
    /// Visibility went up.
    IncreasingAccessibilityChange,
    /// A method was renamed.
    MethodRenaming,
    /// A parameter was removed.
    ParameterDelete,
    /// A parameter was added.
    ParameterInsert,
    /// Parameters were reordered.
    ParameterOrderingChange,
    /// A parameter was renamed.
    ParameterRenaming,
    /// A parameter changed its type.
    ParameterTypeChange,
    /// The superclass changed.
    ParentClassChange,
    /// The superclass was removed.
    ParentClassDelete,
    /// A superclass was added.
    ParentClassInsert,
    /// An implemented interface changed.
    ParentInterfaceChange,
    /// An implemented interface was removed.
    ParentInterfaceDelete,
    /// An implemented interface was added.
    ParentInterfaceInsert,
    /// A class was removed.
    RemovedClass,
    /// A method was removed.
    RemovedFunctionality,
    /// A field was removed.
    RemovedObjectState,
    /// `final` was added to a field.
    RemovingAttributeModifiability,
    /// `final` was added to a class.
    RemovingClassDerivability,
    /// `final` was added to a method.
    RemovingMethodOverridability,
    /// The return type changed.
    ReturnTypeChange,
    /// The method became `void`.
    ReturnTypeDelete,
    /// The method stopped being `void`.
    ReturnTypeInsert,
    /// A statement was removed.
    StatementDelete,
    /// A statement was added.
    StatementInsert,
    /// A statement moved within its parent.
    StatementOrderingChange,
    /// A statement moved to another parent.
    StatementParentChange,
    /// A statement was edited.
    StatementUpdate,
}

impl ChangeType {
    /// Significance of this kind of change.
    pub fn significance(self) -> SignificanceLevel {
        use ChangeType::*;
        match self {
            Unclassified | CommentDelete | CommentInsert | CommentMove | CommentUpdate
            | DocDelete | DocInsert | DocUpdate => SignificanceLevel::None,
            AdditionalClass
            | AdditionalFunctionality
            | AdditionalObjectState
            | StatementOrderingChange
            | StatementUpdate => SignificanceLevel::Low,
            AddingAttributeModifiability
            | ConditionExpressionChange
            | IncreasingAccessibilityChange
            | ParameterRenaming
            | StatementDelete
            | StatementInsert
            | StatementParentChange => SignificanceLevel::Medium,
            AttributeRenaming | AttributeTypeChange | ClassRenaming | MethodRenaming => {
                SignificanceLevel::High
            }
            AddingClassDerivability
            | AddingMethodOverridability
            | DecreasingAccessibilityChange
            | ParameterDelete
            | ParameterInsert
            | ParameterOrderingChange
            | ParameterTypeChange
            | ParentClassChange
            | ParentClassDelete
            | ParentClassInsert
            | ParentInterfaceChange
            | ParentInterfaceDelete
            | ParentInterfaceInsert
            | RemovedClass
            | RemovedFunctionality
            | RemovedObjectState
            | RemovingAttributeModifiability
            | RemovingClassDerivability
            | RemovingMethodOverridability
            | ReturnTypeChange
            | ReturnTypeDelete
            | ReturnTypeInsert => SignificanceLevel::Crucial,
        }
    }
}

/// Byte range of an entity in its source text.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceRange {
    /// Offset of the first byte.
    pub offset: usize,
    /// Length in bytes.
    pub length: usize,
}

impl SourceRange {
    /// Create a range.
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Modifier flags of a declaration, using the JVM access flag bits.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[facet(transparent)]
pub struct Modifiers(pub u32);

impl Modifiers {
    /// No modifiers.
    pub const NONE: Modifiers = Modifiers(0);
    /// `public`
    pub const PUBLIC: Modifiers = Modifiers(0x0001);
    /// `private`
    pub const PRIVATE: Modifiers = Modifiers(0x0002);
    /// `protected`
    pub const PROTECTED: Modifiers = Modifiers(0x0004);
    /// `static`
    pub const STATIC: Modifiers = Modifiers(0x0008);
    /// `final`
    pub const FINAL: Modifiers = Modifiers(0x0010);
    /// `synchronized`
    pub const SYNCHRONIZED: Modifiers = Modifiers(0x0020);
    /// `abstract`
    pub const ABSTRACT: Modifiers = Modifiers(0x0400);

    /// Whether every flag of `other` is set.
    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of both flag sets.
    pub fn with(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    /// Whether no access modifier is set.
    pub fn is_package_private(self) -> bool {
        self.0 & (Self::PUBLIC.0 | Self::PRIVATE.0 | Self::PROTECTED.0) == 0
    }
}

/// Payload attached to every tree node and carried by every change.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceCodeEntity {
    /// Unique name, or the node value for statements.
    pub unique_name: String,
    /// What kind of entity this is.
    pub entity_type: EntityType,
    /// Modifier flags.
    pub modifiers: Modifiers,
    /// Where the entity lives in its source text.
    pub range: SourceRange,
}

impl SourceCodeEntity {
    /// Create an entity without modifiers.
    pub fn new(unique_name: impl Into<String>, entity_type: EntityType, range: SourceRange) -> Self {
        Self {
            unique_name: unique_name.into(),
            entity_type,
            modifiers: Modifiers::NONE,
            range,
        }
    }

    /// Replace the modifier flags.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Same entity type and unique name; ranges are ignored.
    pub fn same_as(&self, other: &SourceCodeEntity) -> bool {
        self.entity_type == other.entity_type && self.unique_name == other.unique_name
    }
}

/// The structure entity (method, field or class) a change belongs to.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructureEntity {
    /// `Method`, `Attribute` or `Class`.
    pub entity_type: EntityType,
    /// Fully qualified name, e.g. `org.example.Foo.bar(int)`.
    pub unique_name: String,
    /// Modifier flags.
    pub modifiers: Modifiers,
}

impl StructureEntity {
    /// Create a structure entity.
    pub fn new(entity_type: EntityType, unique_name: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            entity_type,
            unique_name: unique_name.into(),
            modifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_statement_set_excludes_wrappers() {
        assert!(EntityType::IfStatement.is_statement());
        assert!(EntityType::ReturnStatement.is_statement());
        assert!(
            !EntityType::ThenStatement.is_statement(),
            "branch wrappers are structural"
        );
        assert!(!EntityType::Block.is_statement());
        assert!(!EntityType::Javadoc.is_statement());
    }

    #[test]
    fn test_type_labels() {
        assert!(EntityType::PrimitiveType.is_type());
        assert!(EntityType::ParameterizedType.is_type());
        assert!(!EntityType::SingleVariableDeclaration.is_type());
    }

    #[test]
    fn test_significance() {
        assert_eq!(
            ChangeType::CommentInsert.significance(),
            SignificanceLevel::None
        );
        assert_eq!(
            ChangeType::StatementUpdate.significance(),
            SignificanceLevel::Low
        );
        assert_eq!(
            ChangeType::IncreasingAccessibilityChange.significance(),
            SignificanceLevel::Medium
        );
        assert_eq!(
            ChangeType::MethodRenaming.significance(),
            SignificanceLevel::High
        );
        assert_eq!(
            ChangeType::ReturnTypeInsert.significance(),
            SignificanceLevel::Crucial
        );
        assert!(SignificanceLevel::Crucial > SignificanceLevel::High);
    }

    #[test]
    fn test_modifiers() {
        let m = Modifiers::PUBLIC.with(Modifiers::FINAL);
        assert!(m.contains(Modifiers::PUBLIC));
        assert!(m.contains(Modifiers::FINAL));
        assert!(!m.contains(Modifiers::STATIC));
        assert!(!m.is_package_private());
        assert!(Modifiers::STATIC.is_package_private());
    }

    #[test]
    fn test_same_as_ignores_range() {
        let a = SourceCodeEntity::new("x", EntityType::SimpleType, SourceRange::new(0, 1));
        let b = SourceCodeEntity::new("x", EntityType::SimpleType, SourceRange::new(10, 1));
        assert!(a.same_as(&b));
        assert_ne!(a, b);
    }
}
