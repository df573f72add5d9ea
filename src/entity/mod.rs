//! Sea-ORM entity definitions.
//!
//! Store tables (`user`, `role`, `product`, `order` and their join tables),
//! blog tables (`post`, `comment`) and the `tower_sessions` table used by the
//! session store.

pub mod comment;
pub mod order;
pub mod order_product;
pub mod post;
pub mod product;
pub mod role;
pub mod session;
pub mod user;
pub mod user_role;

pub use comment::{Entity as Comment, Model as CommentModel};
pub use order::{Entity as Order, Model as OrderModel};
pub use order_product::Entity as OrderProduct;
pub use post::{Entity as Post, Model as PostModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use role::{Entity as Role, Model as RoleModel};
pub use session::Entity as Session;
pub use user::{Entity as User, Model as UserModel};
pub use user_role::Entity as UserRole;
