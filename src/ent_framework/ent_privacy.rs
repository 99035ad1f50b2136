// Ent Privacy System - who may do what to comments, posts, users and the dashboard

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use crate::core::{EntityKind, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::{Actor, ViewerContext};

/// Privacy rule context for access control decisions
#[derive(Debug, Clone, PartialEq)]
pub struct PrivacyContext {
    pub entity_kind: EntityKind,
    pub operation: PrivacyOperation,
    pub actor: Option<Actor>,
    /// Author of the target record, or for `Query` the owner filter being requested.
    pub owner_id: Option<UserId>,
}

impl PrivacyContext {
    pub fn new(entity_kind: EntityKind, operation: PrivacyOperation, viewer: &ViewerContext) -> Self {
        Self {
            entity_kind,
            operation,
            actor: viewer.actor,
            owner_id: None,
        }
    }

    pub fn owned_by(mut self, owner_id: Option<UserId>) -> Self {
        self.owner_id = owner_id;
        self
    }

    fn actor_is_owner(&self) -> bool {
        matches!((self.actor, self.owner_id), (Some(actor), Some(owner)) if actor.user_id == owner)
    }
}

/// Operations that can be controlled by privacy policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivacyOperation {
    Create,
    Read,
    Update,
    Delete,
    Like,
    Query,
    Aggregate,
}

impl fmt::Display for PrivacyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrivacyOperation::Create => "create",
            PrivacyOperation::Read => "read",
            PrivacyOperation::Update => "update",
            PrivacyOperation::Delete => "delete",
            PrivacyOperation::Like => "like",
            PrivacyOperation::Query => "query",
            PrivacyOperation::Aggregate => "aggregate",
        };
        f.write_str(name)
    }
}

/// Privacy rule result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyResult {
    Allow,
    Deny,
    Skip, // continue to the next rule
}

#[async_trait]
pub trait PrivacyRule: Send + Sync {
    async fn evaluate(&self, ctx: &PrivacyContext) -> AppResult<PrivacyResult>;

    fn name(&self) -> &str;

    fn operations(&self) -> Vec<PrivacyOperation>;

    /// Higher is evaluated first
    fn priority(&self) -> i32;
}

/// Privacy policy registry
#[derive(Default)]
pub struct PrivacyRegistry {
    rules: HashMap<EntityKind, Vec<Box<dyn PrivacyRule>>>,
}

impl PrivacyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_rule(&mut self, entity_kind: EntityKind, rule: Box<dyn PrivacyRule>) {
        let rules = self.rules.entry(entity_kind).or_default();
        rules.push(rule);
        rules.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// First non-Skip verdict wins; nothing applicable means Deny.
    pub async fn evaluate_access(&self, ctx: &PrivacyContext) -> AppResult<PrivacyResult> {
        if let Some(rules) = self.rules.get(&ctx.entity_kind) {
            for rule in rules {
                if !rule.operations().contains(&ctx.operation) {
                    continue;
                }
                match rule.evaluate(ctx).await? {
                    PrivacyResult::Skip => continue,
                    verdict => {
                        tracing::trace!(
                            rule = rule.name(),
                            kind = %ctx.entity_kind,
                            operation = %ctx.operation,
                            ?verdict,
                            "privacy rule matched"
                        );
                        return Ok(verdict);
                    }
                }
            }
        }

        Ok(PrivacyResult::Deny)
    }

    /// `Forbidden` unless the registry allows the operation.
    pub async fn enforce(&self, ctx: &PrivacyContext) -> AppResult<()> {
        match self.evaluate_access(ctx).await? {
            PrivacyResult::Allow => Ok(()),
            _ => Err(AppError::Forbidden(format!(
                "{} on {} is not permitted for this user",
                ctx.operation, ctx.entity_kind
            ))),
        }
    }
}

/// Administrators are allowed the listed operations.
pub struct AdminAccessRule {
    operations: Vec<PrivacyOperation>,
}

impl AdminAccessRule {
    pub fn new(operations: Vec<PrivacyOperation>) -> Self {
        Self { operations }
    }
}

#[async_trait]
impl PrivacyRule for AdminAccessRule {
    async fn evaluate(&self, ctx: &PrivacyContext) -> AppResult<PrivacyResult> {
        if ctx.actor.map_or(false, |actor| actor.is_admin) {
            Ok(PrivacyResult::Allow)
        } else {
            Ok(PrivacyResult::Skip)
        }
    }

    fn name(&self) -> &str {
        "admin_access"
    }

    fn operations(&self) -> Vec<PrivacyOperation> {
        self.operations.clone()
    }

    fn priority(&self) -> i32 {
        1000
    }
}

/// The record's author (or the user a query is scoped to) is allowed.
pub struct OwnerAccessRule {
    operations: Vec<PrivacyOperation>,
}

impl OwnerAccessRule {
    pub fn new(operations: Vec<PrivacyOperation>) -> Self {
        Self { operations }
    }
}

#[async_trait]
impl PrivacyRule for OwnerAccessRule {
    async fn evaluate(&self, ctx: &PrivacyContext) -> AppResult<PrivacyResult> {
        if ctx.actor_is_owner() {
            Ok(PrivacyResult::Allow)
        } else {
            Ok(PrivacyResult::Skip)
        }
    }

    fn name(&self) -> &str {
        "owner_access"
    }

    fn operations(&self) -> Vec<PrivacyOperation> {
        self.operations.clone()
    }

    fn priority(&self) -> i32 {
        200
    }
}

/// Any authenticated actor is allowed.
pub struct AuthenticatedActorRule {
    operations: Vec<PrivacyOperation>,
}

impl AuthenticatedActorRule {
    pub fn new(operations: Vec<PrivacyOperation>) -> Self {
        Self { operations }
    }
}

#[async_trait]
impl PrivacyRule for AuthenticatedActorRule {
    async fn evaluate(&self, ctx: &PrivacyContext) -> AppResult<PrivacyResult> {
        if ctx.actor.is_some() {
            Ok(PrivacyResult::Allow)
        } else {
            Ok(PrivacyResult::Skip)
        }
    }

    fn name(&self) -> &str {
        "authenticated_actor"
    }

    fn operations(&self) -> Vec<PrivacyOperation> {
        self.operations.clone()
    }

    fn priority(&self) -> i32 {
        150
    }
}

/// Public access rule - anyone, anonymous included
pub struct PublicReadRule {
    operations: Vec<PrivacyOperation>,
}

impl PublicReadRule {
    pub fn new(operations: Vec<PrivacyOperation>) -> Self {
        Self { operations }
    }
}

#[async_trait]
impl PrivacyRule for PublicReadRule {
    async fn evaluate(&self, ctx: &PrivacyContext) -> AppResult<PrivacyResult> {
        match ctx.operation {
            PrivacyOperation::Read | PrivacyOperation::Query => Ok(PrivacyResult::Allow),
            _ => Ok(PrivacyResult::Skip),
        }
    }

    fn name(&self) -> &str {
        "public_read"
    }

    fn operations(&self) -> Vec<PrivacyOperation> {
        self.operations.clone()
    }

    fn priority(&self) -> i32 {
        100
    }
}

/// The blog's authorization table.
///
/// Comment edits are deliberately absent from the admin rule: only authors edit.
pub fn create_blog_privacy_registry() -> PrivacyRegistry {
    use PrivacyOperation::*;

    let mut registry = PrivacyRegistry::new();

    registry.register_rule(EntityKind::Comment, Box::new(AdminAccessRule::new(vec![Delete, Query])));
    registry.register_rule(
        EntityKind::Comment,
        Box::new(OwnerAccessRule::new(vec![Update, Delete, Query])),
    );
    registry.register_rule(
        EntityKind::Comment,
        Box::new(AuthenticatedActorRule::new(vec![Create, Like])),
    );
    registry.register_rule(EntityKind::Comment, Box::new(PublicReadRule::new(vec![Read])));

    registry.register_rule(EntityKind::Post, Box::new(AdminAccessRule::new(vec![Delete])));
    registry.register_rule(EntityKind::Post, Box::new(OwnerAccessRule::new(vec![Delete])));
    registry.register_rule(EntityKind::Post, Box::new(PublicReadRule::new(vec![Read, Query])));

    registry.register_rule(EntityKind::User, Box::new(AdminAccessRule::new(vec![Query])));

    registry.register_rule(EntityKind::Dashboard, Box::new(AdminAccessRule::new(vec![Aggregate])));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: UserId = UserId(1);

    fn author() -> ViewerContext {
        ViewerContext::authenticated_user(AUTHOR, "t".to_string())
    }

    fn other() -> ViewerContext {
        ViewerContext::authenticated_user(UserId(2), "t".to_string())
    }

    fn admin() -> ViewerContext {
        ViewerContext::admin(UserId(99), "t".to_string())
    }

    fn anon() -> ViewerContext {
        ViewerContext::anonymous("t".to_string())
    }

    async fn allowed(
        registry: &PrivacyRegistry,
        kind: EntityKind,
        op: PrivacyOperation,
        viewer: &ViewerContext,
        owner: Option<UserId>,
    ) -> bool {
        let ctx = PrivacyContext::new(kind, op, viewer).owned_by(owner);
        registry.evaluate_access(&ctx).await.unwrap() == PrivacyResult::Allow
    }

    #[tokio::test]
    async fn test_comment_mutation_table() {
        let registry = create_blog_privacy_registry();
        let kind = EntityKind::Comment;
        let owner = Some(AUTHOR);

        // edit: author only, admins included in the deny
        assert!(allowed(&registry, kind, PrivacyOperation::Update, &author(), owner).await);
        assert!(!allowed(&registry, kind, PrivacyOperation::Update, &admin(), owner).await);
        assert!(!allowed(&registry, kind, PrivacyOperation::Update, &other(), owner).await);

        // delete: author or admin
        assert!(allowed(&registry, kind, PrivacyOperation::Delete, &author(), owner).await);
        assert!(allowed(&registry, kind, PrivacyOperation::Delete, &admin(), owner).await);
        assert!(!allowed(&registry, kind, PrivacyOperation::Delete, &other(), owner).await);

        // create and like: any authenticated user
        for op in [PrivacyOperation::Create, PrivacyOperation::Like] {
            assert!(allowed(&registry, kind, op, &author(), owner).await);
            assert!(allowed(&registry, kind, op, &other(), owner).await);
            assert!(allowed(&registry, kind, op, &admin(), owner).await);
            assert!(!allowed(&registry, kind, op, &anon(), owner).await);
        }

        assert!(allowed(&registry, kind, PrivacyOperation::Read, &anon(), None).await);
    }

    #[tokio::test]
    async fn test_comment_moderation_listing() {
        let registry = create_blog_privacy_registry();
        let kind = EntityKind::Comment;
        let op = PrivacyOperation::Query;

        assert!(allowed(&registry, kind, op, &admin(), None).await);
        assert!(allowed(&registry, kind, op, &author(), Some(AUTHOR)).await);
        assert!(!allowed(&registry, kind, op, &author(), None).await);
        assert!(!allowed(&registry, kind, op, &other(), Some(AUTHOR)).await);
    }

    #[tokio::test]
    async fn test_admin_only_surfaces() {
        let registry = create_blog_privacy_registry();

        assert!(allowed(&registry, EntityKind::User, PrivacyOperation::Query, &admin(), None).await);
        assert!(!allowed(&registry, EntityKind::User, PrivacyOperation::Query, &author(), None).await);

        let ctx = PrivacyContext::new(EntityKind::Dashboard, PrivacyOperation::Aggregate, &other());
        assert!(matches!(registry.enforce(&ctx).await, Err(AppError::Forbidden(_))));
        let ctx = PrivacyContext::new(EntityKind::Dashboard, PrivacyOperation::Aggregate, &admin());
        assert!(registry.enforce(&ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_posts_public_but_delete_guarded() {
        let registry = create_blog_privacy_registry();
        let kind = EntityKind::Post;

        assert!(allowed(&registry, kind, PrivacyOperation::Query, &anon(), None).await);
        assert!(allowed(&registry, kind, PrivacyOperation::Read, &anon(), None).await);
        assert!(allowed(&registry, kind, PrivacyOperation::Delete, &author(), Some(AUTHOR)).await);
        assert!(allowed(&registry, kind, PrivacyOperation::Delete, &admin(), Some(AUTHOR)).await);
        assert!(!allowed(&registry, kind, PrivacyOperation::Delete, &other(), Some(AUTHOR)).await);
    }

    #[tokio::test]
    async fn test_unregistered_operation_defaults_to_deny() {
        let registry = PrivacyRegistry::new();
        let ctx = PrivacyContext::new(EntityKind::Post, PrivacyOperation::Read, &admin());
        assert_eq!(registry.evaluate_access(&ctx).await.unwrap(), PrivacyResult::Deny);
    }
}
